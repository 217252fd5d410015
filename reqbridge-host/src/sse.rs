//! Server-Sent Events stream and config file watcher.

use std::convert::Infallible;
use std::path::Path;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use notify::{Event as NotifyEvent, EventKind, PollWatcher, RecursiveMode, Watcher};
use reqbridge::io::config::load_config;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::{AppState, ChangeEvent};

#[derive(Serialize)]
struct SsePayload {
    #[serde(rename = "type")]
    event_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<&ChangeEvent> for SsePayload {
    fn from(event: &ChangeEvent) -> Self {
        match event {
            ChangeEvent::ConfigChanged => SsePayload {
                event_type: "config_changed",
                message: None,
            },
            ChangeEvent::ConfigInvalid { message } => SsePayload {
                event_type: "config_invalid",
                message: Some(message.clone()),
            },
        }
    }
}

fn payload_json(event: &ChangeEvent) -> Option<String> {
    serde_json::to_string(&SsePayload::from(event)).ok()
}

/// GET /events - each configuration reload as a `change` event.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.event_tx.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(change) => {
                    if let Some(json) = payload_json(&change) {
                        yield Ok(Event::default().event("change").data(json));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Start the config watcher in a background task.
pub fn start_config_watcher(state: AppState) {
    tokio::spawn(async move {
        if let Err(e) = run_config_watcher(state).await {
            warn!(error = %e, "config watcher failed");
        }
    });
}

async fn run_config_watcher(state: AppState) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel::<NotifyEvent>(100);

    let mut watcher = PollWatcher::new(
        move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.try_send(event);
            }
        },
        notify::Config::default().with_poll_interval(Duration::from_millis(250)),
    )?;

    // Watching the directory catches the file being created later.
    let Some(config_dir) = state.config_path.parent() else {
        warn!(path = %state.config_path.display(), "config path has no parent");
        return Ok(());
    };
    if !config_dir.exists() {
        warn!(path = %config_dir.display(), "config directory missing, not watching");
        return Ok(());
    }
    watcher.watch(config_dir, RecursiveMode::NonRecursive)?;
    info!(path = %state.config_path.display(), "watching config file");

    // Batch so an editor's write-then-rename produces one reload.
    let mut pending_events: Vec<NotifyEvent> = Vec::new();
    let mut flush_tick = tokio::time::interval(Duration::from_millis(250));
    flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                pending_events.push(event);
            }
            _ = flush_tick.tick() => {
                if pending_events.is_empty() {
                    continue;
                }
                if touches_config(&state.config_path, &pending_events) {
                    reload_config(&state).await;
                }
                pending_events.clear();
            }
        }
    }
}

fn touches_config(config_path: &Path, events: &[NotifyEvent]) -> bool {
    events
        .iter()
        .filter(|event| matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)))
        .any(|event| event.paths.iter().any(|path| path == config_path))
}

/// Load the config file and publish it. An invalid file keeps the current
/// snapshot.
pub async fn reload_config(state: &AppState) {
    match load_config(&state.config_path) {
        Ok(config) => {
            state.activation.watchers.publish(config).await;
            debug!("broadcasting config change");
            let _ = state.event_tx.send(ChangeEvent::ConfigChanged);
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "config reload failed");
            let _ = state.event_tx.send(ChangeEvent::ConfigInvalid {
                message: format!("{err:#}"),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use reqbridge::activate::{Host, activate};
    use reqbridge::engine::parsers::ParserKind;
    use reqbridge::io::config::BridgeConfig;
    use reqbridge::io::local_fs::LocalFs;
    use reqbridge::watch::ConfigWatchers;

    use crate::host::{HostWorkspace, LiveExecutor, TerminalPrompt};

    fn modify_event(path: PathBuf) -> NotifyEvent {
        NotifyEvent {
            kind: EventKind::Modify(notify::event::ModifyKind::Any),
            paths: vec![path],
            attrs: Default::default(),
        }
    }

    async fn app_state(project_dir: &Path) -> AppState {
        let watchers = ConfigWatchers::new(BridgeConfig::default());
        let host = Host {
            fs: Arc::new(LocalFs),
            workspace: Arc::new(HostWorkspace::new(
                project_dir.to_path_buf(),
                Vec::new(),
                watchers.clone(),
            )),
            prompt: Arc::new(TerminalPrompt::default()),
            executor: Arc::new(LiveExecutor::new(watchers.clone())),
        };
        let activation = activate(host, watchers).await;
        AppState::new(
            project_dir.to_path_buf(),
            project_dir.join(".reqbridge").join("config.toml"),
            activation,
        )
    }

    #[test]
    fn change_payload_carries_message_only_when_invalid() {
        assert_eq!(
            payload_json(&ChangeEvent::ConfigChanged).as_deref(),
            Some(r#"{"type":"config_changed"}"#)
        );
        assert_eq!(
            payload_json(&ChangeEvent::ConfigInvalid {
                message: "bad toml".to_string(),
            })
            .as_deref(),
            Some(r#"{"type":"config_invalid","message":"bad toml"}"#)
        );
    }

    #[test]
    fn only_config_file_events_count() {
        let config = PathBuf::from("/p/.reqbridge/config.toml");
        assert!(touches_config(&config, &[modify_event(config.clone())]));
        assert!(!touches_config(
            &config,
            &[modify_event(PathBuf::from("/p/.reqbridge/other.toml"))]
        ));

        let removed = NotifyEvent {
            kind: EventKind::Remove(notify::event::RemoveKind::Any),
            paths: vec![config.clone()],
            attrs: Default::default(),
        };
        assert!(!touches_config(&config, &[removed]));
    }

    #[tokio::test]
    async fn reload_publishes_and_broadcasts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = app_state(dir.path()).await;
        let mut rx = state.event_tx.subscribe();

        std::fs::create_dir_all(dir.path().join(".reqbridge")).expect("mkdir");
        std::fs::write(&state.config_path, "http_region_script = \"region.js\"\n")
            .expect("write config");
        reload_config(&state).await;

        assert_eq!(rx.try_recv().ok(), Some(ChangeEvent::ConfigChanged));
        assert_eq!(
            state.activation.engine.region_parser_kinds().await.last(),
            Some(&ParserKind::SettingsScript)
        );
    }

    #[tokio::test]
    async fn invalid_config_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = app_state(dir.path()).await;
        let mut rx = state.event_tx.subscribe();

        std::fs::create_dir_all(dir.path().join(".reqbridge")).expect("mkdir");
        std::fs::write(&state.config_path, "[script]\noutput_limit_bytes = 0\n").expect("write config");
        reload_config(&state).await;

        assert!(matches!(rx.try_recv(), Ok(ChangeEvent::ConfigInvalid { .. })));
        assert_eq!(*state.activation.watchers.current(), BridgeConfig::default());
    }
}
