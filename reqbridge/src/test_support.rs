//! In-memory fakes for the host capabilities.
//!
//! Compiled for unit tests and behind the `test-support` feature for the
//! integration tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tempfile::TempDir;

use crate::core::locator::ResourceLocator;
use crate::engine::script::{ScriptExecutor, ScriptRequest};
use crate::io::host::{
    FileStat, FileType, HostFs, InputRequest, OpenDocument, UserPrompt, Workspace,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `file` locator for an absolute path. Panics on relative input.
pub fn file_locator(path: &str) -> ResourceLocator {
    ResourceLocator::from_file_path(path).expect("absolute test path")
}

fn not_found(locator: &ResourceLocator) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{locator} not found"))
}

fn child_prefix(locator: &ResourceLocator) -> String {
    let text = locator.as_str();
    if text.ends_with('/') {
        text.to_string()
    } else {
        format!("{text}/")
    }
}

#[derive(Default)]
struct MemoryState {
    files: BTreeMap<ResourceLocator, Vec<u8>>,
    dirs: BTreeSet<ResourceLocator>,
    reads: usize,
}

impl MemoryState {
    /// Explicit directories plus every ancestor of a stored entry.
    fn is_dir(&self, locator: &ResourceLocator) -> bool {
        if self.dirs.contains(locator) {
            return true;
        }
        let prefix = child_prefix(locator);
        self.files
            .keys()
            .chain(self.dirs.iter())
            .any(|key| key.as_str().starts_with(&prefix))
    }

    fn children(&self, locator: &ResourceLocator) -> Vec<(String, FileType)> {
        let prefix = child_prefix(locator);
        let mut listed: BTreeMap<String, FileType> = BTreeMap::new();
        let entries = self
            .files
            .keys()
            .map(|key| (key, FileType::File))
            .chain(self.dirs.iter().map(|key| (key, FileType::Directory)));
        for (key, kind) in entries {
            let Some(rest) = key.as_str().strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((first, _)) => {
                    listed.insert(first.to_string(), FileType::Directory);
                }
                None if !rest.is_empty() => {
                    listed.entry(rest.to_string()).or_insert(kind);
                }
                None => {}
            }
        }
        listed.into_iter().collect()
    }
}

/// Shared in-memory storage. Clones see the same contents.
#[derive(Clone, Default)]
pub struct MemoryFs {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, contents: &str) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        lock(&self.state).dirs.insert(file_locator(path));
        self
    }

    pub fn insert(&self, path: &str, contents: &str) {
        lock(&self.state)
            .files
            .insert(file_locator(path), contents.as_bytes().to_vec());
    }

    pub fn contains(&self, locator: &ResourceLocator) -> bool {
        lock(&self.state).files.contains_key(locator)
    }

    /// Successful and failed `read_file` calls so far.
    pub fn read_count(&self) -> usize {
        lock(&self.state).reads
    }
}

#[async_trait]
impl HostFs for MemoryFs {
    async fn stat(&self, locator: &ResourceLocator) -> io::Result<FileStat> {
        let state = lock(&self.state);
        if let Some(contents) = state.files.get(locator) {
            return Ok(FileStat {
                file_type: FileType::File,
                size: contents.len() as u64,
            });
        }
        if state.is_dir(locator) {
            return Ok(FileStat {
                file_type: FileType::Directory,
                size: 0,
            });
        }
        Err(not_found(locator))
    }

    async fn read_file(&self, locator: &ResourceLocator) -> io::Result<Vec<u8>> {
        let mut state = lock(&self.state);
        state.reads += 1;
        if let Some(contents) = state.files.get(locator) {
            return Ok(contents.clone());
        }
        if state.is_dir(locator) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{locator} is a directory"),
            ));
        }
        Err(not_found(locator))
    }

    async fn write_file(&self, locator: &ResourceLocator, contents: &[u8]) -> io::Result<()> {
        lock(&self.state)
            .files
            .insert(locator.clone(), contents.to_vec());
        Ok(())
    }

    async fn read_directory(
        &self,
        locator: &ResourceLocator,
    ) -> io::Result<Vec<(String, FileType)>> {
        let state = lock(&self.state);
        if !state.is_dir(locator) {
            return Err(not_found(locator));
        }
        Ok(state.children(locator))
    }
}

/// Workspace with fixed roots and visible editors.
#[derive(Debug, Clone, Default)]
pub struct FakeWorkspace {
    roots: Vec<ResourceLocator>,
    documents: Vec<OpenDocument>,
}

impl FakeWorkspace {
    pub fn with_root(mut self, path: &str) -> Self {
        self.roots.push(file_locator(path));
        self
    }

    pub fn with_root_path(mut self, path: &Path) -> Self {
        self.roots
            .push(ResourceLocator::from_file_path(path).expect("absolute root"));
        self
    }

    pub fn with_document(mut self, document: OpenDocument) -> Self {
        self.documents.push(document);
        self
    }
}

impl Workspace for FakeWorkspace {
    fn visible_documents(&self) -> Vec<OpenDocument> {
        self.documents.clone()
    }

    fn workspace_roots(&self) -> Vec<ResourceLocator> {
        self.roots.clone()
    }
}

#[derive(Default)]
struct PromptLog {
    inputs: VecDeque<Option<String>>,
    picks: VecDeque<Option<String>>,
    confirms: VecDeque<bool>,
    input_requests: Vec<InputRequest>,
    pick_requests: Vec<(String, Vec<String>)>,
    confirmations: Vec<(String, String)>,
    errors: Vec<String>,
}

/// Answers prompts from queues and records every question.
///
/// An exhausted queue answers as if the user dismissed the prompt.
#[derive(Default)]
pub struct ScriptedPrompt {
    log: Mutex<PromptLog>,
}

impl ScriptedPrompt {
    pub fn with_inputs<'a>(self, answers: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        lock(&self.log)
            .inputs
            .extend(answers.into_iter().map(|a| a.map(str::to_string)));
        self
    }

    pub fn with_picks<'a>(self, answers: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        lock(&self.log)
            .picks
            .extend(answers.into_iter().map(|a| a.map(str::to_string)));
        self
    }

    pub fn with_confirms(self, answers: impl IntoIterator<Item = bool>) -> Self {
        lock(&self.log).confirms.extend(answers);
        self
    }

    pub fn input_requests(&self) -> Vec<InputRequest> {
        lock(&self.log).input_requests.clone()
    }

    pub fn pick_requests(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.log).pick_requests.clone()
    }

    pub fn confirmations(&self) -> Vec<(String, String)> {
        lock(&self.log).confirmations.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        lock(&self.log).errors.clone()
    }
}

#[async_trait]
impl UserPrompt for ScriptedPrompt {
    async fn input(&self, request: InputRequest) -> Option<String> {
        let mut log = lock(&self.log);
        log.input_requests.push(request);
        log.inputs.pop_front().flatten()
    }

    async fn pick(&self, placeholder: &str, items: &[String]) -> Option<String> {
        let mut log = lock(&self.log);
        log.pick_requests
            .push((placeholder.to_string(), items.to_vec()));
        log.picks.pop_front().flatten()
    }

    async fn confirm(&self, message: &str, action: &str) -> bool {
        let mut log = lock(&self.log);
        log.confirmations
            .push((message.to_string(), action.to_string()));
        log.confirms.pop_front().unwrap_or(false)
    }

    fn show_error(&self, message: &str) {
        lock(&self.log).errors.push(message.to_string());
    }
}

/// Records script requests instead of running them.
#[derive(Default)]
pub struct RecordingExecutor {
    requests: Mutex<Vec<ScriptRequest>>,
    failures_left: AtomicUsize,
}

impl RecordingExecutor {
    /// Fail the next `count` executions.
    pub fn failing(count: usize) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(count),
        }
    }

    pub fn requests(&self) -> Vec<ScriptRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ScriptExecutor for RecordingExecutor {
    async fn execute_script(&self, request: ScriptRequest) -> Result<()> {
        let file = request.file_name.clone();
        lock(&self.requests).push(request);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(anyhow!("scripted failure in {file}"));
        }
        Ok(())
    }
}

/// Workspace roots on the real filesystem, removed on drop.
pub struct TempRoots {
    dirs: Vec<TempDir>,
}

impl TempRoots {
    pub fn new(count: usize) -> Self {
        let dirs = (0..count)
            .map(|_| tempfile::tempdir().expect("temp root"))
            .collect();
        Self { dirs }
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.dirs[index].path().to_path_buf()
    }

    /// Write `contents` to `relative` under root `index`, creating parents.
    pub fn write(&self, index: usize, relative: &str, contents: &str) -> PathBuf {
        let path = self.dirs[index].path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parents");
        }
        std::fs::write(&path, contents).expect("write temp file");
        path
    }

    pub fn workspace(&self) -> FakeWorkspace {
        self.dirs
            .iter()
            .fold(FakeWorkspace::default(), |ws, dir| ws.with_root_path(dir.path()))
    }
}
