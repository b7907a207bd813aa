//! Host configuration for plugin discovery.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::NodeError;
use crate::plugin::ENTRY_SYMBOL;

/// Environment variable listing plugin directories, separated like `PATH`.
pub const PLUGIN_PATH_ENV: &str = "TETHER_PLUGIN_PATH";
/// Environment variable overriding the entry symbol.
pub const ENTRY_SYMBOL_ENV: &str = "TETHER_PLUGIN_SYMBOL";

/// Where plugins live and how to enter them.
///
/// ```
/// use tether_node::HostConfig;
///
/// let config = HostConfig::from_toml_str(r#"
///     plugin_dirs = ["plugins", "/opt/tether/plugins"]
///     fail_on_load_error = true
/// "#).unwrap();
///
/// assert_eq!(config.plugin_dirs.len(), 2);
/// assert_eq!(config.entry_symbol, "register_node_factories");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Directories scanned by `load_configured_plugins`, in order.
    pub plugin_dirs: Vec<PathBuf>,
    /// Exported entry symbol looked up in each module.
    pub entry_symbol: String,
    /// Turn the first failed or partial module into an error.
    pub fail_on_load_error: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plugin_dirs: Vec::new(),
            entry_symbol: ENTRY_SYMBOL.to_owned(),
            fail_on_load_error: false,
        }
    }
}

impl HostConfig {
    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, NodeError> {
        toml::from_str(text).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Read a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Defaults overridden by `TETHER_PLUGIN_PATH` and `TETHER_PLUGIN_SYMBOL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(paths) = env::var_os(PLUGIN_PATH_ENV) {
            config.plugin_dirs = env::split_paths(&paths)
                .filter(|dir| !dir.as_os_str().is_empty())
                .collect();
        }
        if let Ok(symbol) = env::var(ENTRY_SYMBOL_ENV)
            && !symbol.is_empty()
        {
            config.entry_symbol = symbol;
        }
        config
    }

    /// Add a plugin directory.
    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dirs.push(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(HostConfig::from_toml_str("").unwrap(), HostConfig::default());
    }

    #[test]
    fn custom_symbol() {
        let config = HostConfig::from_toml_str(r#"entry_symbol = "nodes_entry""#).unwrap();
        assert_eq!(config.entry_symbol, "nodes_entry");
        assert!(!config.fail_on_load_error);
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = HostConfig::from_toml_str("plugin_dirs = 3").unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.toml");
        std::fs::write(&path, "plugin_dirs = [\"a\"]\n").unwrap();
        let config = HostConfig::from_file(&path).unwrap();
        assert_eq!(config.plugin_dirs, [PathBuf::from("a")]);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = HostConfig::from_file("/nonexistent/host.toml").unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }
}
