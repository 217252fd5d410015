//! Bridge configuration stored as TOML (default `.reqbridge/config.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::locator::ResourceLocator;
use crate::logging;

pub const DEFAULT_CONFIG_PATH: &str = ".reqbridge/config.toml";

/// Bridge configuration (TOML).
///
/// Edited by humans while the host runs; every save produces a new snapshot
/// that the watchers react to. Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Script evaluated as an extra region parser before each request.
    pub http_region_script: Option<String>,

    /// Script executed once after the host starts.
    pub extension_script: Option<String>,

    /// Roots searched, in order, for relative script paths.
    pub workspace_roots: Vec<PathBuf>,

    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,

    pub script: ScriptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScriptConfig {
    /// Interpreter command; the script text is fed on stdin.
    pub command: Vec<String>,

    /// Truncate captured script stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            command: vec!["node".to_string(), "-".to_string()],
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            http_region_script: None,
            extension_script: None,
            workspace_roots: Vec::new(),
            log_level: "warn".to_string(),
            script: ScriptConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if !logging::is_valid_level(&self.log_level) {
            return Err(anyhow!("log_level {:?} is not a valid filter", self.log_level));
        }
        if self.script.command.is_empty() || self.script.command[0].trim().is_empty() {
            return Err(anyhow!("script.command must be a non-empty array"));
        }
        if self.script.output_limit_bytes == 0 {
            return Err(anyhow!("script.output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    /// Blank script paths mean "not configured".
    pub fn http_region_script(&self) -> Option<&str> {
        non_blank(self.http_region_script.as_deref())
    }

    pub fn extension_script(&self) -> Option<&str> {
        non_blank(self.extension_script.as_deref())
    }

    /// Workspace roots as locators, relative entries anchored at `base_dir`.
    pub fn root_locators(&self, base_dir: &Path) -> Vec<ResourceLocator> {
        self.workspace_roots
            .iter()
            .filter_map(|root| ResourceLocator::from_file_path(base_dir.join(root)).ok())
            .collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BridgeConfig::default()`.
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    if !path.exists() {
        let cfg = BridgeConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parse {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<BridgeConfig> {
    let cfg: BridgeConfig = toml::from_str(contents)?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, BridgeConfig::default());
    }

    #[test]
    fn saved_file_loads_back() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".reqbridge").join("config.toml");
        let cfg = BridgeConfig {
            http_region_script: Some("scripts/setup.js".to_string()),
            workspace_roots: vec![PathBuf::from("api")],
            ..BridgeConfig::default()
        };
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, toml::to_string_pretty(&cfg).expect("serialize")).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg = parse_config("extension_script = \"/abs/init.js\"\n").expect("parse");
        assert_eq!(cfg.extension_script(), Some("/abs/init.js"));
        assert_eq!(cfg.script, ScriptConfig::default());
        assert_eq!(cfg.log_level, "warn");
    }

    #[test]
    fn blank_script_paths_are_unset() {
        let cfg = parse_config("http_region_script = \"  \"\n").expect("parse");
        assert_eq!(cfg.http_region_script(), None);
    }

    #[test]
    fn rejects_empty_script_command() {
        let err = parse_config("[script]\ncommand = []\n").expect_err("empty command");
        assert!(err.to_string().contains("script.command"));
    }

    #[test]
    fn rejects_invalid_log_level() {
        assert!(parse_config("log_level = \"reqbridge=loud\"\n").is_err());
    }

    #[test]
    fn relative_roots_anchor_at_base_dir() {
        let cfg = BridgeConfig {
            workspace_roots: vec![PathBuf::from("a"), PathBuf::from("/abs/b")],
            ..BridgeConfig::default()
        };
        let roots = cfg.root_locators(Path::new("/project"));
        assert_eq!(
            roots,
            vec![
                ResourceLocator::from_file_path("/project/a").expect("a"),
                ResourceLocator::from_file_path("/abs/b").expect("b"),
            ]
        );
    }
}
