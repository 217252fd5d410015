//! Boundary of the request engine as the bridge sees it.
//!
//! The engine owns an ordered pipeline of region parsers and variable
//! replacers, a cache of prepared documents and a script runner. Parsing
//! and sending requests stay inside the engine; this module holds only the
//! state the bridge has to reach.

pub mod parsers;
pub mod replacers;
pub mod script;
pub mod store;

use std::sync::Arc;

use anyhow::Result as AnyResult;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::core::locator::{PathLike, resolve};
use crate::core::registry::OrderedRegistry;
use crate::error::Result;
use crate::io::encoding::FileEncoding;
use crate::io::file_access::FileAccess;
use parsers::{BUILTIN_REGION_PARSERS, ParserKind, RegionParser};
use replacers::{BUILTIN_VARIABLE_REPLACERS, VariableReplacer};
use script::{ScriptExecutor, ScriptRequest};
use store::{DocumentStore, HttpDocument};

/// Ordered engine components. Earlier entries run first.
#[derive(Default)]
pub struct Pipeline {
    pub region_parsers: OrderedRegistry<RegionParser>,
    pub variable_replacers: OrderedRegistry<VariableReplacer>,
}

impl Pipeline {
    pub fn with_builtins() -> Self {
        let mut pipeline = Self::default();
        for name in BUILTIN_REGION_PARSERS {
            pipeline.region_parsers.append_last(RegionParser::Builtin(*name));
        }
        for name in BUILTIN_VARIABLE_REPLACERS {
            pipeline
                .variable_replacers
                .append_last(VariableReplacer::Builtin(*name));
        }
        pipeline
    }
}

pub struct Engine {
    files: FileAccess,
    pipeline: RwLock<Pipeline>,
    store: DocumentStore,
    executor: Arc<dyn ScriptExecutor>,
}

impl Engine {
    pub fn new(files: FileAccess, executor: Arc<dyn ScriptExecutor>) -> Self {
        Self {
            files,
            pipeline: RwLock::new(Pipeline::with_builtins()),
            store: DocumentStore::new(),
            executor,
        }
    }

    pub fn files(&self) -> &FileAccess {
        &self.files
    }

    /// Shared pipeline. Writers must not hold the guard across prompts or
    /// script loads.
    pub fn pipeline(&self) -> &RwLock<Pipeline> {
        &self.pipeline
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Read, prepare and cache a document. Cached until the store is cleared.
    #[instrument(skip_all)]
    pub async fn load_document(&self, path: impl Into<PathLike>) -> Result<Arc<HttpDocument>> {
        let locator = resolve(&path.into())?;
        if let Some(doc) = self.store.get(&locator).await {
            return Ok(doc);
        }

        let generation = self.store.generation().await;
        let text = self
            .files
            .read_file(locator.clone(), FileEncoding::Utf8)
            .await?;
        let parsers = self.pipeline.read().await.region_parsers.snapshot();

        let mut doc = HttpDocument::new(locator, text);
        for parser in &parsers {
            parser.prepare(&mut doc).await;
        }
        let doc = Arc::new(doc);
        if !self.store.insert_if_current(doc.clone(), generation).await {
            debug!(locator = %doc.locator, "pipeline changed while preparing; not cached");
        }
        Ok(doc)
    }

    /// Ask for every `@note` of `doc`. `false` as soon as one is declined.
    /// Without a note parser in the pipeline nothing is asked.
    pub async fn confirm_notes(&self, doc: &HttpDocument) -> bool {
        let parser = {
            let pipeline = self.pipeline.read().await;
            pipeline
                .region_parsers
                .iter()
                .find(|parser| matches!(parser.as_ref(), RegionParser::NoteMeta(_)))
                .cloned()
        };
        let Some(parser) = parser else {
            return true;
        };
        let RegionParser::NoteMeta(notes) = parser.as_ref() else {
            return true;
        };
        for note in &doc.notes {
            if !notes.confirm(note).await {
                return false;
            }
        }
        true
    }

    /// Run `text` through every replacer in order. `None` when a prompt was
    /// dismissed.
    pub async fn replace_variables(&self, text: &str) -> Option<String> {
        let replacers = self.pipeline.read().await.variable_replacers.snapshot();
        let mut current = text.to_string();
        for replacer in &replacers {
            current = replacer.replace(&current).await?;
        }
        Some(current)
    }

    pub async fn execute_script(&self, request: ScriptRequest) -> AnyResult<()> {
        self.executor.execute_script(request).await
    }

    pub async fn region_parser_kinds(&self) -> Vec<ParserKind> {
        self.pipeline.read().await.region_parsers.kinds()
    }
}
