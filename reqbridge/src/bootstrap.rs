//! Runs the configured bootstrap script once per host session.
//!
//! The runner stays subscribed until a run succeeds, so fixing the path or
//! the script and saving the configuration retries it.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info, instrument};

use crate::core::locator::{ResourceLocator, resolve};
use crate::engine::Engine;
use crate::engine::script::ScriptRequest;
use crate::error::{BridgeError, Result};
use crate::io::config::BridgeConfig;
use crate::io::encoding::FileEncoding;
use crate::io::host::UserPrompt;
use crate::watch::{ConfigWatchers, WatcherHandle};

pub struct BootstrapScript {
    engine: Arc<Engine>,
    prompt: Arc<dyn UserPrompt>,
    /// Serializes overlapping notifications.
    running: tokio::sync::Mutex<()>,
    done: AtomicBool,
    handle: Mutex<Option<WatcherHandle>>,
}

impl BootstrapScript {
    pub fn new(engine: Arc<Engine>, prompt: Arc<dyn UserPrompt>) -> Self {
        Self {
            engine,
            prompt,
            running: tokio::sync::Mutex::new(()),
            done: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    /// Subscribe to `watchers`. The subscription ends after the first
    /// successful run or on [`BootstrapScript::dispose`].
    pub fn install(self: Arc<Self>, watchers: &ConfigWatchers) -> Arc<Self> {
        let runner = self.clone();
        let handle = watchers.subscribe(move |config| {
            let runner = runner.clone();
            async move { runner.on_config_change(&config).await }
        });
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        // A publish may have completed a run before the handle was stored.
        if self.has_run() {
            self.dispose();
        }
        self
    }

    pub fn has_run(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    pub fn is_subscribed(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(WatcherHandle::is_active)
    }

    pub fn dispose(&self) {
        if let Some(handle) = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.dispose();
        }
    }

    #[instrument(skip_all)]
    pub async fn on_config_change(&self, config: &BridgeConfig) {
        let Some(path) = config.extension_script() else {
            return;
        };
        let _running = self.running.lock().await;
        if self.has_run() {
            return;
        }

        match self.run(path).await {
            Ok(locator) => {
                info!(script = %locator, "bootstrap script executed");
                self.done.store(true, Ordering::SeqCst);
                self.dispose();
            }
            Err(err @ BridgeError::ConfigurationScriptMissing(_)) => {
                self.prompt.show_error(&err.to_string());
                error!(error = %err, "bootstrap script unusable");
            }
            Err(err) => error!(error = %err, "bootstrap script failed"),
        }
    }

    async fn run(&self, path: &str) -> Result<ResourceLocator> {
        let files = self.engine.files();
        if !Path::new(path).is_absolute() || !files.exists(path).await {
            return Err(BridgeError::ConfigurationScriptMissing(path.to_string()));
        }
        let locator = resolve(&path.into())?;
        let script = files.read_file(locator.clone(), FileEncoding::Utf8).await?;
        self.engine
            .execute_script(ScriptRequest::standalone(script, locator.clone()))
            .await
            .map_err(BridgeError::ExecutionFailure)?;
        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::file_access::FileAccess;
    use crate::test_support::{FakeWorkspace, MemoryFs, RecordingExecutor, ScriptedPrompt, file_locator};

    struct Fixture {
        executor: Arc<RecordingExecutor>,
        prompt: Arc<ScriptedPrompt>,
        runner: Arc<BootstrapScript>,
        watchers: ConfigWatchers,
    }

    fn fixture(fs: MemoryFs, executor: RecordingExecutor) -> Fixture {
        let files = FileAccess::new(Arc::new(fs), Arc::new(FakeWorkspace::default()));
        let executor = Arc::new(executor);
        let engine = Arc::new(Engine::new(files, executor.clone()));
        let prompt = Arc::new(ScriptedPrompt::default());
        let watchers = ConfigWatchers::new(BridgeConfig::default());
        let runner = Arc::new(BootstrapScript::new(engine, prompt.clone())).install(&watchers);
        Fixture {
            executor,
            prompt,
            runner,
            watchers,
        }
    }

    fn with_bootstrap(path: &str) -> BridgeConfig {
        BridgeConfig {
            extension_script: Some(path.to_string()),
            ..BridgeConfig::default()
        }
    }

    #[tokio::test]
    async fn unset_script_is_a_no_op() {
        let f = fixture(MemoryFs::new(), RecordingExecutor::default());
        f.watchers.publish(BridgeConfig::default()).await;
        assert!(f.executor.requests().is_empty());
        assert!(f.prompt.errors().is_empty());
        assert!(f.runner.is_subscribed());
    }

    #[tokio::test]
    async fn runs_once_then_unsubscribes() {
        let fs = MemoryFs::new().with_file("/abs/init.js", "console.log('hi')");
        let f = fixture(fs, RecordingExecutor::default());

        f.watchers.publish(with_bootstrap("/abs/init.js")).await;
        f.watchers.publish(with_bootstrap("/abs/init.js")).await;

        let requests = f.executor.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].script, "console.log('hi')");
        assert_eq!(requests[0].file_name, file_locator("/abs/init.js"));
        assert!(requests[0].variables.is_empty());
        assert_eq!(requests[0].line_offset, 0);
        assert!(f.runner.has_run());
        assert!(!f.runner.is_subscribed());
        assert_eq!(f.watchers.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn overlapping_notifications_execute_once() {
        let fs = MemoryFs::new().with_file("/abs/init.js", "init()");
        let f = fixture(fs, RecordingExecutor::default());
        let config = with_bootstrap("/abs/init.js");

        futures::join!(
            f.runner.on_config_change(&config),
            f.runner.on_config_change(&config)
        );
        assert_eq!(f.executor.requests().len(), 1);
    }

    #[tokio::test]
    async fn relative_path_notifies_user_and_stays_subscribed() {
        let fs = MemoryFs::new().with_file("/init.js", "init()");
        let f = fixture(fs, RecordingExecutor::default());

        f.watchers.publish(with_bootstrap("init.js")).await;

        assert!(f.executor.requests().is_empty());
        assert_eq!(f.prompt.errors(), vec!["bootstrap script not found: init.js".to_string()]);
        assert!(f.runner.is_subscribed());
    }

    #[tokio::test]
    async fn missing_file_notifies_user_and_retries_later() {
        let fs = MemoryFs::new();
        let f = fixture(fs.clone(), RecordingExecutor::default());

        f.watchers.publish(with_bootstrap("/abs/init.js")).await;
        assert_eq!(f.prompt.errors().len(), 1);
        assert!(f.runner.is_subscribed());

        fs.insert("/abs/init.js", "init()");
        f.watchers.publish(with_bootstrap("/abs/init.js")).await;
        assert_eq!(f.executor.requests().len(), 1);
        assert!(!f.runner.is_subscribed());
    }

    #[tokio::test]
    async fn execution_failure_keeps_subscription_without_popup() {
        let fs = MemoryFs::new().with_file("/abs/init.js", "throw 1");
        let f = fixture(fs, RecordingExecutor::failing(1));

        f.watchers.publish(with_bootstrap("/abs/init.js")).await;
        assert!(!f.runner.has_run());
        assert!(f.runner.is_subscribed());
        assert!(f.prompt.errors().is_empty());

        f.watchers.publish(with_bootstrap("/abs/init.js")).await;
        assert_eq!(f.executor.requests().len(), 2);
        assert!(f.runner.has_run());
        assert!(!f.runner.is_subscribed());
    }

    #[tokio::test]
    async fn dispose_stops_future_runs() {
        let fs = MemoryFs::new().with_file("/abs/init.js", "init()");
        let f = fixture(fs, RecordingExecutor::default());

        f.runner.dispose();
        f.watchers.publish(with_bootstrap("/abs/init.js")).await;
        assert!(f.executor.requests().is_empty());
    }
}
