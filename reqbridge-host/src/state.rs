//! Shared application state for the host server.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use reqbridge::activate::Activation;
use tokio::sync::broadcast;

/// Events broadcast to SSE clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A new configuration snapshot was published.
    ConfigChanged,
    /// The config file changed but could not be loaded; the previous
    /// snapshot stays active.
    ConfigInvalid { message: String },
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Directory relative request paths are resolved against.
    pub project_dir: PathBuf,
    pub config_path: PathBuf,
    pub activation: Arc<Activation>,
    /// Broadcast sender for change events.
    pub event_tx: Arc<broadcast::Sender<ChangeEvent>>,
}

impl AppState {
    pub fn new(project_dir: PathBuf, config_path: PathBuf, activation: Activation) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            project_dir,
            config_path,
            activation: Arc::new(activation),
            event_tx: Arc::new(event_tx),
        }
    }

    /// Absolute form of a path given by a client, or `None` when it would
    /// leave the project directory.
    pub fn project_path(&self, path: &str) -> Option<PathBuf> {
        confine(&self.project_dir, path)
    }
}

/// Join `path` onto `base` when it is relative and has no `..` or root
/// components. Symlinks inside `base` are followed as-is.
fn confine(base: &Path, path: &str) -> Option<PathBuf> {
    let path = Path::new(path);
    path.components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
        .then(|| base.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_stay_under_project() {
        let base = Path::new("/project");
        assert_eq!(
            confine(base, "api/users.http"),
            Some(PathBuf::from("/project/api/users.http"))
        );
        assert_eq!(confine(base, "./api"), Some(PathBuf::from("/project/./api")));
        assert_eq!(confine(base, ""), Some(PathBuf::from("/project")));
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let base = Path::new("/project");
        assert_eq!(confine(base, "/etc/passwd"), None);
        assert_eq!(confine(base, ".."), None);
        assert_eq!(confine(base, "api/../../secret"), None);
    }
}
