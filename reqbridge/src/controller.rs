//! Keeps the script-driven region parser in sync with the configuration.
//!
//! Each configuration change clears the document store and swaps the
//! script-driven parser under one pipeline write guard, so concurrent
//! reconfigurations apply one after another. The script itself is loaded
//! lazily by the parser, from whatever path is configured at load time.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, trace};

use crate::core::script_path::script_candidates;
use crate::engine::Engine;
use crate::engine::parsers::{ParserKind, RegionParser, ScriptSource, SettingsScriptParser};
use crate::engine::script::ScriptSnippet;
use crate::error::{BridgeError, Result};
use crate::io::config::BridgeConfig;
use crate::io::encoding::FileEncoding;
use crate::io::file_access::FileAccess;
use crate::watch::{ConfigWatchers, WatcherHandle};

pub struct PipelineController {
    engine: Arc<Engine>,
    watchers: ConfigWatchers,
}

impl PipelineController {
    pub fn new(engine: Arc<Engine>, watchers: ConfigWatchers) -> Self {
        Self { engine, watchers }
    }

    /// Subscribe to configuration changes.
    pub fn install(self: Arc<Self>) -> WatcherHandle {
        let watchers = self.watchers.clone();
        watchers.subscribe(move |config| {
            let controller = self.clone();
            async move { controller.reconfigure(&config).await }
        })
    }

    /// Apply `config` to the pipeline.
    #[instrument(skip_all, fields(script = config.http_region_script().unwrap_or("")))]
    pub async fn reconfigure(&self, config: &BridgeConfig) {
        let mut pipeline = self.engine.pipeline().write().await;
        self.engine.store().clear().await;

        let removed = pipeline
            .region_parsers
            .remove_where(ParserKind::SettingsScript);
        let added = config.http_region_script().is_some();
        if added {
            let source =
                ConfiguredScript::new(self.engine.files().clone(), self.watchers.clone());
            pipeline
                .region_parsers
                .append_last(RegionParser::SettingsScript(SettingsScriptParser::new(
                    Arc::new(source),
                )));
        }
        debug!(removed, added, parsers = pipeline.region_parsers.len(), "pipeline reconfigured");
    }
}

/// Loads the configured region script from disk.
///
/// Absolute paths are read directly. Relative paths are tried against each
/// workspace root in order; the first readable file wins. Misses are
/// expected and only trace-logged.
pub struct ConfiguredScript {
    files: FileAccess,
    watchers: ConfigWatchers,
}

impl ConfiguredScript {
    pub fn new(files: FileAccess, watchers: ConfigWatchers) -> Self {
        Self { files, watchers }
    }

    async fn read_first(&self, configured: &str) -> Result<ScriptSnippet> {
        let roots = self.files.workspace().workspace_roots();
        for candidate in script_candidates(configured, &roots) {
            match self
                .files
                .read_file(candidate.clone(), FileEncoding::Utf8)
                .await
            {
                Ok(script) => {
                    return Ok(ScriptSnippet {
                        script,
                        line_offset: 0,
                    });
                }
                Err(err) => trace!(file = %candidate, error = %err, "file not found"),
            }
        }
        Err(BridgeError::ResourceNotFound(configured.to_string()))
    }
}

#[async_trait]
impl ScriptSource for ConfiguredScript {
    async fn load(&self) -> Option<ScriptSnippet> {
        let config = self.watchers.current();
        let configured = config.http_region_script()?;
        match self.read_first(configured).await {
            Ok(snippet) => Some(snippet),
            Err(err) => {
                trace!(error = %err, "region script unavailable");
                None
            }
        }
    }
}
