//! Region parsers: pipeline components that interpret document content.
//!
//! The engine proper owns request parsing. The bridge only contributes the
//! parsers that need host capabilities; built-ins appear here by name so
//! their position in the pipeline is visible.

use std::fmt;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::core::registry::Kinded;
use crate::engine::script::ScriptSnippet;
use crate::engine::store::HttpDocument;
use crate::io::host::UserPrompt;

/// Built-in region parsers in their default order.
pub const BUILTIN_REGION_PARSERS: &[&str] = &[
    "meta",
    "comment",
    "variable",
    "javascript",
    "request",
    "response",
];

const NOTE_ACTION: &str = "Execute";
const DEFAULT_NOTE: &str = "Are you sure you want to send the request?";

static NOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:#+|//)[ \t]*@note\b[ \t]*(?P<note>.*?)[ \t]*$")
        .expect("note regex should be valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Builtin(&'static str),
    NoteMeta,
    SettingsScript,
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(name) => f.write_str(name),
            Self::NoteMeta => f.write_str("note-meta"),
            Self::SettingsScript => f.write_str("settings-script"),
        }
    }
}

pub enum RegionParser {
    Builtin(&'static str),
    NoteMeta(NoteMetaParser),
    SettingsScript(SettingsScriptParser),
}

impl Kinded for RegionParser {
    type Kind = ParserKind;

    fn kind(&self) -> ParserKind {
        match self {
            Self::Builtin(name) => ParserKind::Builtin(*name),
            Self::NoteMeta(_) => ParserKind::NoteMeta,
            Self::SettingsScript(_) => ParserKind::SettingsScript,
        }
    }
}

impl RegionParser {
    /// Contribute this parser's findings to a freshly read document.
    pub async fn prepare(&self, doc: &mut HttpDocument) {
        match self {
            Self::Builtin(_) => {}
            Self::NoteMeta(parser) => doc.notes.extend(parser.collect_notes(&doc.text)),
            Self::SettingsScript(parser) => {
                if let Some(snippet) = parser.script().await {
                    doc.region_scripts.push(snippet);
                }
            }
        }
    }
}

/// Gate requests annotated with `# @note ...` behind a user confirmation.
pub struct NoteMetaParser {
    prompt: Arc<dyn UserPrompt>,
}

impl NoteMetaParser {
    pub fn new(prompt: Arc<dyn UserPrompt>) -> Self {
        Self { prompt }
    }

    pub fn collect_notes(&self, text: &str) -> Vec<String> {
        NOTE_RE
            .captures_iter(text)
            .map(|caps| match caps.name("note").map(|m| m.as_str()) {
                Some(note) if !note.is_empty() => note.to_string(),
                _ => DEFAULT_NOTE.to_string(),
            })
            .collect()
    }

    /// Ask the user; `false` when dismissed.
    pub async fn confirm(&self, note: &str) -> bool {
        self.prompt.confirm(note, NOTE_ACTION).await
    }
}

/// Source of the configured region script.
#[async_trait]
pub trait ScriptSource: Send + Sync {
    /// `None` when no script is available right now.
    async fn load(&self) -> Option<ScriptSnippet>;
}

/// Region parser that runs a user-configured script for every region.
///
/// The script is loaded lazily, each time a document is prepared.
pub struct SettingsScriptParser {
    source: Arc<dyn ScriptSource>,
}

impl SettingsScriptParser {
    pub fn new(source: Arc<dyn ScriptSource>) -> Self {
        Self { source }
    }

    pub async fn script(&self) -> Option<ScriptSnippet> {
        self.source.load().await
    }
}
