//! File operations the request engine calls, implemented over host storage.
//!
//! Every operation first resolves its [`PathLike`] argument to a canonical
//! locator. Required operations surface resolution and I/O failures;
//! `is_absolute`, `exists`, `has_extension` and `fs_path` degrade to
//! `false`/`None` instead.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::core::locator::{PathLike, ResourceLocator, Scheme, resolve};
use crate::error::{BridgeError, Result};
use crate::io::encoding::FileEncoding;
use crate::io::host::{FileType, HTTP_LANGUAGE, HostFs, MARKDOWN_LANGUAGE, Workspace};

/// Facade handed to the engine once at activation and shared by reference.
#[derive(Clone)]
pub struct FileAccess {
    fs: Arc<dyn HostFs>,
    workspace: Arc<dyn Workspace>,
}

impl FileAccess {
    pub fn new(fs: Arc<dyn HostFs>, workspace: Arc<dyn Workspace>) -> Self {
        Self { fs, workspace }
    }

    pub fn workspace(&self) -> &dyn Workspace {
        self.workspace.as_ref()
    }

    /// True when the path resolves *and* the resource exists.
    ///
    /// This is an existence check under another name. Engine code relies on
    /// it to decide whether a path can be used as-is, so it stays that way.
    pub async fn is_absolute(&self, path: impl Into<PathLike>) -> bool {
        match resolve(&path.into()) {
            Ok(locator) => self.stat_ok(&locator).await,
            Err(_) => false,
        }
    }

    /// Directory a path lives in.
    ///
    /// Unsaved buffers have no directory of their own; they borrow the one
    /// of the first visible request file, then the first workspace root.
    pub fn dirname(&self, path: impl Into<PathLike>) -> Result<Option<ResourceLocator>> {
        let locator = resolve(&path.into())?;
        if locator.is_persisted() {
            return Ok(Some(locator.parent()));
        }

        let editor = self.workspace.visible_documents().into_iter().find(|doc| {
            doc.language_id == HTTP_LANGUAGE && doc.locator.scheme() == Scheme::File
        });
        if let Some(editor) = editor {
            return Ok(Some(editor.locator.parent()));
        }
        Ok(self.workspace.workspace_roots().into_iter().next())
    }

    /// True when the locator text ends with one of `extensions`.
    ///
    /// Matching is case-sensitive. Asking for `markdown` also matches a
    /// visible editor for this locator tagged as markdown.
    pub fn has_extension(&self, path: impl Into<PathLike>, extensions: &[&str]) -> bool {
        let Ok(locator) = resolve(&path.into()) else {
            return false;
        };
        if extensions.iter().any(|ext| locator.as_str().ends_with(ext)) {
            return true;
        }
        if extensions.contains(&MARKDOWN_LANGUAGE) {
            return self
                .workspace
                .visible_documents()
                .iter()
                .any(|doc| doc.locator == locator && doc.language_id == MARKDOWN_LANGUAGE);
        }
        false
    }

    pub fn join_path(&self, path: impl Into<PathLike>, segment: &str) -> Result<ResourceLocator> {
        Ok(resolve(&path.into())?.join(segment))
    }

    /// Never fails: resolution and stat errors both read as "absent".
    pub async fn exists(&self, path: impl Into<PathLike>) -> bool {
        match resolve(&path.into()) {
            Ok(locator) => self.stat_ok(&locator).await,
            Err(_) => false,
        }
    }

    pub async fn read_file(&self, path: impl Into<PathLike>, encoding: FileEncoding) -> Result<String> {
        let bytes = self.read_buffer(path).await?;
        Ok(encoding.decode(&bytes))
    }

    pub async fn read_buffer(&self, path: impl Into<PathLike>) -> Result<Vec<u8>> {
        let locator = resolve(&path.into())?;
        self.fs
            .read_file(&locator)
            .await
            .map_err(|err| BridgeError::io(format!("read {locator}"), err))
    }

    pub async fn write_buffer(&self, path: impl Into<PathLike>, contents: &[u8]) -> Result<()> {
        let locator = resolve(&path.into())?;
        self.fs
            .write_file(&locator, contents)
            .await
            .map_err(|err| BridgeError::io(format!("write {locator}"), err))
    }

    /// Entry names of a directory. An existing non-directory lists as empty.
    pub async fn readdir(&self, path: impl Into<PathLike>) -> Result<Vec<String>> {
        let locator = resolve(&path.into())?;
        let stat = self
            .fs
            .stat(&locator)
            .await
            .map_err(|err| BridgeError::io(format!("stat {locator}"), err))?;
        if stat.file_type != FileType::Directory {
            trace!(locator = %locator, "not a directory");
            return Ok(Vec::new());
        }
        let entries = self
            .fs
            .read_directory(&locator)
            .await
            .map_err(|err| BridgeError::io(format!("read directory {locator}"), err))?;
        Ok(entries.into_iter().map(|(name, _)| name).collect())
    }

    /// Local path for `file` locators, `None` otherwise.
    pub fn fs_path(&self, path: impl Into<PathLike>) -> Option<PathBuf> {
        let path = path.into();
        let locator = match resolve(&path) {
            Ok(locator) => locator,
            Err(err) => {
                debug!(path = %path, error = %err, "no locator for fs path");
                return None;
            }
        };
        if !locator.is_file() {
            return None;
        }
        let projected = locator.to_file_path();
        if projected.is_none() {
            debug!(locator = %locator, "file locator has no local path");
        }
        projected
    }

    async fn stat_ok(&self, locator: &ResourceLocator) -> bool {
        match self.fs.stat(locator).await {
            Ok(_) => true,
            Err(err) => {
                trace!(locator = %locator, error = %err, "stat failed");
                false
            }
        }
    }
}
