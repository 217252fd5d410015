//! Canonical resource locators and the resolver that produces them.
//!
//! Hosts hand the engine paths in several shapes: plain strings, already
//! parsed locators, or handles to editor buffers that may have no file
//! behind them. [`resolve`] maps all of them onto one [`ResourceLocator`]
//! so file operations never care how a path was originally expressed.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use url::Url;

use crate::core::path::join_normalized;
use crate::error::{BridgeError, Result};

pub const FILE_SCHEME: &str = "file";
pub const UNTITLED_SCHEME: &str = "untitled";

/// Storage scheme of a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme<'a> {
    /// Local filesystem.
    File,
    /// Editor buffer that was never saved.
    Untitled,
    Other(&'a str),
}

/// Canonical, immutable identity of a storage location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceLocator {
    url: Url,
}

impl ResourceLocator {
    /// Parse a full locator string such as `file:///ws/a.http` or
    /// `untitled:Untitled-1`.
    pub fn parse(text: &str) -> Result<Self> {
        let url = Url::parse(text).map_err(|_| BridgeError::NoValidLocator(text.to_string()))?;
        Ok(Self { url })
    }

    /// Locator for an absolute local filesystem path.
    pub fn from_file_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let url = Url::from_file_path(path)
            .map_err(|()| BridgeError::NoValidLocator(path.display().to_string()))?;
        Ok(Self { url })
    }

    /// Locator for an unsaved editor buffer.
    pub fn untitled(name: &str) -> Result<Self> {
        Self::parse(&format!("{UNTITLED_SCHEME}:{name}"))
    }

    pub fn scheme(&self) -> Scheme<'_> {
        match self.url.scheme() {
            FILE_SCHEME => Scheme::File,
            UNTITLED_SCHEME => Scheme::Untitled,
            other => Scheme::Other(other),
        }
    }

    pub fn is_file(&self) -> bool {
        self.scheme() == Scheme::File
    }

    /// False for buffers that have no durable storage behind them.
    pub fn is_persisted(&self) -> bool {
        self.scheme() != Scheme::Untitled
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Last non-empty path segment.
    pub fn file_name(&self) -> Option<&str> {
        self.url.path().rsplit('/').find(|segment| !segment.is_empty())
    }

    /// New locator with `segment` appended to the path and `.`/`..` collapsed.
    pub fn join(&self, segment: &str) -> Self {
        let mut url = self.url.clone();
        url.set_path(&join_normalized(self.url.path(), segment));
        Self { url }
    }

    pub fn parent(&self) -> Self {
        self.join("..")
    }

    /// Local path for `file` locators. `None` for other schemes or when the
    /// locator has no local projection (e.g. a remote host component).
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if !self.is_file() {
            return None;
        }
        self.url.to_file_path().ok()
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

impl Serialize for ResourceLocator {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.url.as_str())
    }
}

/// Handle to an editor buffer.
///
/// `uri` is the buffer identity; `file_uri` is set when the buffer is backed
/// by a file (e.g. a notebook cell whose document lives on disk).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDocument {
    pub uri: ResourceLocator,
    pub file_uri: Option<ResourceLocator>,
}

/// Any value the engine may pass where it means "a path".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathLike {
    /// Plain local filesystem path.
    Path(String),
    Locator(ResourceLocator),
    Virtual(VirtualDocument),
}

impl PathLike {
    pub fn resolve(&self) -> Result<ResourceLocator> {
        resolve(self)
    }
}

impl fmt::Display for PathLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.write_str(path),
            Self::Locator(locator) => locator.fmt(f),
            Self::Virtual(doc) => doc.uri.fmt(f),
        }
    }
}

impl From<&str> for PathLike {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for PathLike {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for PathLike {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for PathLike {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

impl From<ResourceLocator> for PathLike {
    fn from(locator: ResourceLocator) -> Self {
        Self::Locator(locator)
    }
}

impl From<&ResourceLocator> for PathLike {
    fn from(locator: &ResourceLocator) -> Self {
        Self::Locator(locator.clone())
    }
}

impl From<VirtualDocument> for PathLike {
    fn from(doc: VirtualDocument) -> Self {
        Self::Virtual(doc)
    }
}

/// Map a path-like value onto its canonical locator.
///
/// Plain strings become `file` locators; relative strings are rooted at `/`
/// since locators carry no working directory. Strings that cannot name a
/// file (empty, embedded NUL) fail with [`BridgeError::NoValidLocator`].
pub fn resolve(input: &PathLike) -> Result<ResourceLocator> {
    match input {
        PathLike::Path(path) => {
            if path.is_empty() || path.contains('\0') {
                return Err(BridgeError::NoValidLocator(path.clone()));
            }
            let path = Path::new(path);
            if path.is_absolute() {
                ResourceLocator::from_file_path(path)
            } else {
                ResourceLocator::from_file_path(Path::new("/").join(path))
            }
        }
        PathLike::Locator(locator) => Ok(locator.clone()),
        PathLike::Virtual(doc) => Ok(doc.file_uri.clone().unwrap_or_else(|| doc.uri.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> ResourceLocator {
        ResourceLocator::from_file_path(path).expect("file locator")
    }

    #[test]
    fn plain_string_resolves_to_file_scheme() {
        let locator = resolve(&PathLike::from("/ws/api/get.http")).expect("resolve");
        assert_eq!(locator.as_str(), "file:///ws/api/get.http");
        assert_eq!(locator.scheme(), Scheme::File);
    }

    #[test]
    fn relative_string_is_rooted() {
        let locator = resolve(&PathLike::from("scripts/setup.js")).expect("resolve");
        assert_eq!(locator.as_str(), "file:///scripts/setup.js");
    }

    #[test]
    fn locator_is_returned_unchanged() {
        let locator = ResourceLocator::parse("vscode-notebook-cell:/ws/a.http#cell1").expect("parse");
        let resolved = resolve(&PathLike::from(&locator)).expect("resolve");
        assert_eq!(resolved, locator);
    }

    #[test]
    fn virtual_document_prefers_backing_file() {
        let doc = VirtualDocument {
            uri: ResourceLocator::parse("vscode-notebook-cell:/ws/a.http#cell1").expect("parse"),
            file_uri: Some(file("/ws/a.http")),
        };
        assert_eq!(resolve(&doc.into()).expect("resolve"), file("/ws/a.http"));
    }

    #[test]
    fn virtual_document_without_file_uses_identity() {
        let untitled = ResourceLocator::untitled("Untitled-1").expect("untitled");
        let doc = VirtualDocument {
            uri: untitled.clone(),
            file_uri: None,
        };
        let resolved = resolve(&doc.into()).expect("resolve");
        assert_eq!(resolved, untitled);
        assert!(!resolved.is_persisted());
    }

    #[test]
    fn empty_string_has_no_locator() {
        let err = resolve(&PathLike::from("")).expect_err("empty path");
        assert!(matches!(err, BridgeError::NoValidLocator(_)));
    }

    #[test]
    fn resolving_output_again_is_idempotent() {
        let inputs = [
            PathLike::from("/ws/a.http"),
            PathLike::from(file("/ws/b.http")),
            PathLike::from(VirtualDocument {
                uri: ResourceLocator::untitled("Untitled-2").expect("untitled"),
                file_uri: None,
            }),
            PathLike::from(VirtualDocument {
                uri: ResourceLocator::untitled("Untitled-3").expect("untitled"),
                file_uri: Some(file("/ws/c.http")),
            }),
        ];
        for input in inputs {
            let once = resolve(&input).expect("first resolve");
            let twice = resolve(&PathLike::from(&once)).expect("second resolve");
            assert_eq!(once, twice);
            assert_eq!(resolve(&input).expect("repeat resolve"), once);
        }
    }

    #[test]
    fn join_and_parent_normalize() {
        let base = file("/ws/api");
        assert_eq!(base.join("scripts/../get.http"), file("/ws/api/get.http"));
        assert_eq!(file("/ws/api/get.http").parent(), file("/ws/api"));
    }

    #[test]
    fn file_projection_only_for_file_scheme() {
        assert_eq!(file("/ws/a.http").to_file_path(), Some(PathBuf::from("/ws/a.http")));
        assert_eq!(ResourceLocator::untitled("Untitled-1").expect("untitled").to_file_path(), None);
    }

    #[test]
    fn file_name_is_last_segment() {
        assert_eq!(file("/ws/api/get.http").file_name(), Some("get.http"));
    }
}
