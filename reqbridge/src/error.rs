//! Error taxonomy for locator resolution and file access.

use thiserror::Error;

/// Errors raised by the file access facade and the configuration reactors.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A path-like value could not be turned into a locator.
    #[error("no valid locator for {0:?}")]
    NoValidLocator(String),

    /// Expected miss during fallback lookups. Callers catch and trace-log it.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// The bootstrap script is configured but cannot be used.
    #[error("bootstrap script not found: {0}")]
    ConfigurationScriptMissing(String),

    /// The bootstrap script failed while executing.
    #[error("script execution failed: {0:#}")]
    ExecutionFailure(anyhow::Error),

    /// Host storage failure on a required path.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True for failures that mean "nothing there" rather than a broken host.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ResourceNotFound(_) => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_counts_as_not_found() {
        let err = BridgeError::io(
            "read file:///missing",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            format!(
                "read file:///missing: {}",
                std::io::Error::from(std::io::ErrorKind::NotFound)
            )
        );
    }

    #[test]
    fn no_valid_locator_is_not_a_miss() {
        let err = BridgeError::NoValidLocator(String::new());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "no valid locator for \"\"");
    }
}
