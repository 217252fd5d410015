//! Capabilities the editing host injects into the bridge.
//!
//! The bridge has no default implementation of the editor-facing traits;
//! hosts supply them and tests use the fakes in `test_support`.

use std::io;

use async_trait::async_trait;

use crate::core::locator::ResourceLocator;

/// Language tag of request documents.
pub const HTTP_LANGUAGE: &str = "http";
pub const MARKDOWN_LANGUAGE: &str = "markdown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    SymbolicLink,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub file_type: FileType,
    pub size: u64,
}

/// Storage operations over locators.
#[async_trait]
pub trait HostFs: Send + Sync {
    async fn stat(&self, locator: &ResourceLocator) -> io::Result<FileStat>;

    async fn read_file(&self, locator: &ResourceLocator) -> io::Result<Vec<u8>>;

    /// Create or overwrite.
    async fn write_file(&self, locator: &ResourceLocator, contents: &[u8]) -> io::Result<()>;

    /// Immediate entries of a directory.
    async fn read_directory(&self, locator: &ResourceLocator)
    -> io::Result<Vec<(String, FileType)>>;
}

/// An editor buffer currently shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDocument {
    pub locator: ResourceLocator,
    pub language_id: String,
}

/// Editor state the file facade consults.
pub trait Workspace: Send + Sync {
    fn visible_documents(&self) -> Vec<OpenDocument>;

    /// Workspace roots in declaration order.
    fn workspace_roots(&self) -> Vec<ResourceLocator>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRequest {
    pub prompt: String,
    pub placeholder: String,
    /// Pre-filled value.
    pub value: Option<String>,
}

/// User interaction. `None`/`false` means the user dismissed the prompt.
///
/// Prompts have no timeout; they resolve whenever the user answers.
#[async_trait]
pub trait UserPrompt: Send + Sync {
    async fn input(&self, request: InputRequest) -> Option<String>;

    async fn pick(&self, placeholder: &str, items: &[String]) -> Option<String>;

    /// Modal warning with a single `action` button.
    async fn confirm(&self, message: &str, action: &str) -> bool;

    /// Non-blocking error notification.
    fn show_error(&self, message: &str);
}
