//! Variable replacers: pipeline components that supply substitution values.

use std::fmt;
use std::ops::Range;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::core::registry::Kinded;
use crate::io::host::{InputRequest, UserPrompt};

/// Built-in replacers in their default order.
pub const BUILTIN_VARIABLE_REPLACERS: &[&str] = &["environment", "javascript", "host"];

static INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\$input\s+(?P<message>.+?)(?:\s+\$value:\s*(?P<value>.*?))?\s*\}\}")
        .expect("input regex should be valid")
});

static PICK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\$pick\s+(?P<message>.+?)\s+\$value:\s*(?P<value>.+?)\s*\}\}")
        .expect("pick regex should be valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacerKind {
    Builtin(&'static str),
    Input,
    Pick,
}

impl fmt::Display for ReplacerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(name) => f.write_str(name),
            Self::Input => f.write_str("input"),
            Self::Pick => f.write_str("pick"),
        }
    }
}

pub enum VariableReplacer {
    /// Provided by the engine; passes text through unchanged here.
    Builtin(&'static str),
    Input(InputReplacer),
    Pick(PickReplacer),
}

impl Kinded for VariableReplacer {
    type Kind = ReplacerKind;

    fn kind(&self) -> ReplacerKind {
        match self {
            Self::Builtin(name) => ReplacerKind::Builtin(*name),
            Self::Input(_) => ReplacerKind::Input,
            Self::Pick(_) => ReplacerKind::Pick,
        }
    }
}

impl VariableReplacer {
    /// Substitute this replacer's placeholders. `None` when the user
    /// dismissed a prompt.
    pub async fn replace(&self, text: &str) -> Option<String> {
        match self {
            Self::Builtin(_) => Some(text.to_string()),
            Self::Input(replacer) => replacer.replace(text).await,
            Self::Pick(replacer) => replacer.replace(text).await,
        }
    }
}

/// One placeholder occurrence, detached from the source text.
struct Placeholder {
    range: Range<usize>,
    message: String,
    value: Option<String>,
}

fn placeholders(re: &Regex, text: &str) -> Vec<Placeholder> {
    re.captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Placeholder {
                range: whole.range(),
                message: caps.name("message")?.as_str().to_string(),
                value: caps.name("value").map(|m| m.as_str().to_string()),
            })
        })
        .collect()
}

/// Rebuild `text` with each placeholder replaced by its answer.
fn splice(text: &str, answers: Vec<(Range<usize>, String)>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, answer) in answers {
        out.push_str(&text[cursor..range.start]);
        out.push_str(&answer);
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// `{{$input <message> $value: <default>}}` asks for free text.
pub struct InputReplacer {
    prompt: Arc<dyn UserPrompt>,
}

impl InputReplacer {
    pub fn new(prompt: Arc<dyn UserPrompt>) -> Self {
        Self { prompt }
    }

    pub async fn replace(&self, text: &str) -> Option<String> {
        let found = placeholders(&INPUT_RE, text);
        if found.is_empty() {
            return Some(text.to_string());
        }
        let mut answers = Vec::with_capacity(found.len());
        for placeholder in found {
            let request = InputRequest {
                prompt: placeholder.message.clone(),
                placeholder: placeholder.message,
                value: placeholder.value,
            };
            let Some(answer) = self.prompt.input(request).await else {
                debug!("input prompt dismissed");
                return None;
            };
            answers.push((placeholder.range, answer));
        }
        Some(splice(text, answers))
    }
}

/// `{{$pick <message> $value: a,b,c}}` asks for one of the listed values.
pub struct PickReplacer {
    prompt: Arc<dyn UserPrompt>,
}

impl PickReplacer {
    pub fn new(prompt: Arc<dyn UserPrompt>) -> Self {
        Self { prompt }
    }

    pub async fn replace(&self, text: &str) -> Option<String> {
        let found = placeholders(&PICK_RE, text);
        if found.is_empty() {
            return Some(text.to_string());
        }
        let mut answers = Vec::with_capacity(found.len());
        for placeholder in found {
            let items: Vec<String> = placeholder
                .value
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect();
            let Some(answer) = self.prompt.pick(&placeholder.message, &items).await else {
                debug!("pick prompt dismissed");
                return None;
            };
            answers.push((placeholder.range, answer));
        }
        Some(splice(text, answers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedPrompt;

    #[tokio::test]
    async fn input_replaces_each_placeholder_in_order() {
        let prompt = Arc::new(ScriptedPrompt::default().with_inputs([Some("alice"), Some("42")]));
        let replacer = InputReplacer::new(prompt.clone());

        let text = "GET /users/{{$input user name}}?limit={{ $input limit $value: 10 }}";
        let replaced = replacer.replace(text).await.expect("answered");
        assert_eq!(replaced, "GET /users/alice?limit=42");

        let requests = prompt.input_requests();
        assert_eq!(requests[0].prompt, "user name");
        assert_eq!(requests[0].value, None);
        assert_eq!(requests[1].prompt, "limit");
        assert_eq!(requests[1].value.as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn dismissed_input_yields_no_value() {
        let prompt = Arc::new(ScriptedPrompt::default().with_inputs([None]));
        let replacer = InputReplacer::new(prompt);
        assert_eq!(replacer.replace("{{$input token}}").await, None);
    }

    #[tokio::test]
    async fn text_without_placeholders_passes_through() {
        let replacer = InputReplacer::new(Arc::new(ScriptedPrompt::default()));
        assert_eq!(replacer.replace("GET /{{host}}").await.as_deref(), Some("GET /{{host}}"));
    }

    #[tokio::test]
    async fn pick_offers_listed_values() {
        let prompt = Arc::new(ScriptedPrompt::default().with_picks([Some("stage")]));
        let replacer = PickReplacer::new(prompt.clone());

        let replaced = replacer
            .replace("GET https://{{$pick env $value: dev, stage ,prod}}.example.com")
            .await
            .expect("answered");
        assert_eq!(replaced, "GET https://stage.example.com");
        assert_eq!(
            prompt.pick_requests(),
            vec![(
                "env".to_string(),
                vec!["dev".to_string(), "stage".to_string(), "prod".to_string()]
            )]
        );
    }

    #[tokio::test]
    async fn builtin_replacer_is_identity() {
        let replacer = VariableReplacer::Builtin("host");
        assert_eq!(replacer.replace("{{x}}").await.as_deref(), Some("{{x}}"));
        assert_eq!(replacer.kind(), ReplacerKind::Builtin("host"));
    }
}
