//! Terminal-backed host capabilities.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use reqbridge::core::locator::ResourceLocator;
use reqbridge::engine::script::{ScriptExecutor, ScriptRequest};
use reqbridge::io::host::{InputRequest, OpenDocument, UserPrompt, Workspace};
use reqbridge::io::process::ProcessScriptExecutor;
use reqbridge::watch::ConfigWatchers;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

/// Roots from the command line first, then the configured ones. Falls back
/// to the project directory when neither names a root.
///
/// There are no editors, so no document is ever visible.
pub struct HostWorkspace {
    project_dir: PathBuf,
    cli_roots: Vec<PathBuf>,
    watchers: ConfigWatchers,
}

impl HostWorkspace {
    pub fn new(project_dir: PathBuf, cli_roots: Vec<PathBuf>, watchers: ConfigWatchers) -> Self {
        Self {
            project_dir,
            cli_roots,
            watchers,
        }
    }
}

impl Workspace for HostWorkspace {
    fn visible_documents(&self) -> Vec<OpenDocument> {
        Vec::new()
    }

    fn workspace_roots(&self) -> Vec<ResourceLocator> {
        let mut roots: Vec<ResourceLocator> = self
            .cli_roots
            .iter()
            .filter_map(|root| ResourceLocator::from_file_path(self.project_dir.join(root)).ok())
            .collect();
        roots.extend(self.watchers.current().root_locators(&self.project_dir));
        if roots.is_empty() {
            roots.extend(ResourceLocator::from_file_path(&self.project_dir).ok());
        }
        roots
    }
}

/// Prompts on stderr and reads answers from stdin, one at a time.
///
/// End of input counts as dismissal.
pub struct TerminalPrompt {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl TerminalPrompt {
    async fn ask(&self, question: &str) -> Option<String> {
        let mut lines = self.lines.lock().await;
        let mut stderr = tokio::io::stderr();
        if stderr.write_all(question.as_bytes()).await.is_err() {
            return None;
        }
        let _ = stderr.flush().await;
        match lines.next_line().await {
            Ok(Some(line)) => Some(line.trim_end().to_string()),
            Ok(None) => None,
            Err(err) => {
                debug!(error = %err, "stdin read failed");
                None
            }
        }
    }
}

fn input_question(request: &InputRequest) -> String {
    match &request.value {
        Some(value) => format!("{} [{}]: ", request.prompt, value),
        None if !request.placeholder.is_empty() => {
            format!("{} ({}): ", request.prompt, request.placeholder)
        }
        None => format!("{}: ", request.prompt),
    }
}

/// Accepts a 1-based index or the item text itself.
fn parse_pick(answer: &str, items: &[String]) -> Option<String> {
    let answer = answer.trim();
    if let Ok(index) = answer.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|index| items.get(index))
            .cloned();
    }
    items.iter().find(|item| item.as_str() == answer).cloned()
}

fn is_confirmation(answer: &str, action: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y")
        || answer.eq_ignore_ascii_case("yes")
        || answer.eq_ignore_ascii_case(action)
}

#[async_trait]
impl UserPrompt for TerminalPrompt {
    async fn input(&self, request: InputRequest) -> Option<String> {
        let answer = self.ask(&input_question(&request)).await?;
        match request.value {
            Some(value) if answer.is_empty() => Some(value),
            _ => Some(answer),
        }
    }

    async fn pick(&self, placeholder: &str, items: &[String]) -> Option<String> {
        let mut question = format!("{placeholder}\n");
        for (index, item) in items.iter().enumerate() {
            question.push_str(&format!("  {}) {item}\n", index + 1));
        }
        question.push_str("> ");
        parse_pick(&self.ask(&question).await?, items)
    }

    async fn confirm(&self, message: &str, action: &str) -> bool {
        self.ask(&format!("{message} [{action}/N]: "))
            .await
            .is_some_and(|answer| is_confirmation(&answer, action))
    }

    fn show_error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

/// Runs scripts with the interpreter settings of the current snapshot.
pub struct LiveExecutor {
    watchers: ConfigWatchers,
}

impl LiveExecutor {
    pub fn new(watchers: ConfigWatchers) -> Self {
        Self { watchers }
    }
}

#[async_trait]
impl ScriptExecutor for LiveExecutor {
    async fn execute_script(&self, request: ScriptRequest) -> Result<()> {
        let executor = ProcessScriptExecutor::new(&self.watchers.current().script);
        executor.execute_script(request).await
    }
}
