//! One-time wiring of the bridge into a host session.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::bootstrap::BootstrapScript;
use crate::controller::PipelineController;
use crate::engine::Engine;
use crate::engine::parsers::{NoteMetaParser, RegionParser};
use crate::engine::replacers::{InputReplacer, PickReplacer, VariableReplacer};
use crate::engine::script::ScriptExecutor;
use crate::io::file_access::FileAccess;
use crate::io::host::{HostFs, UserPrompt, Workspace};
use crate::watch::{ConfigWatchers, WatcherHandle};

/// Capabilities a host provides at activation.
#[derive(Clone)]
pub struct Host {
    pub fs: Arc<dyn HostFs>,
    pub workspace: Arc<dyn Workspace>,
    pub prompt: Arc<dyn UserPrompt>,
    pub executor: Arc<dyn ScriptExecutor>,
}

/// Live bridge state. Dropping it leaves subscriptions in place; call
/// [`Activation::dispose`] on shutdown.
pub struct Activation {
    pub engine: Arc<Engine>,
    pub files: FileAccess,
    pub watchers: ConfigWatchers,
    pub bootstrap: Arc<BootstrapScript>,
    subscriptions: Vec<WatcherHandle>,
}

impl Activation {
    pub fn dispose(&self) {
        for handle in &self.subscriptions {
            handle.dispose();
        }
        self.bootstrap.dispose();
    }
}

/// Register the interactive components, subscribe the configuration
/// reactors and let them see the current configuration once.
#[instrument(skip_all)]
pub async fn activate(host: Host, watchers: ConfigWatchers) -> Activation {
    let files = FileAccess::new(host.fs, host.workspace);
    let engine = Arc::new(Engine::new(files.clone(), host.executor));

    {
        let mut pipeline = engine.pipeline().write().await;
        pipeline
            .region_parsers
            .append_last(RegionParser::NoteMeta(NoteMetaParser::new(
                host.prompt.clone(),
            )));
        pipeline
            .variable_replacers
            .insert_first(VariableReplacer::Input(InputReplacer::new(
                host.prompt.clone(),
            )));
        pipeline
            .variable_replacers
            .insert_first(VariableReplacer::Pick(PickReplacer::new(
                host.prompt.clone(),
            )));
    }

    let controller = Arc::new(PipelineController::new(engine.clone(), watchers.clone()));
    let subscriptions = vec![controller.install()];
    let bootstrap = Arc::new(BootstrapScript::new(engine.clone(), host.prompt)).install(&watchers);

    watchers.notify_current().await;
    let parsers = engine.region_parser_kinds().await.len();
    info!(parsers, "bridge activated");

    Activation {
        engine,
        files,
        watchers,
        bootstrap,
        subscriptions,
    }
}
