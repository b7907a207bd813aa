//! Logger configuration and presets

use serde::{Deserialize, Serialize};

/// Filter variable read first by [`Config::from_env`].
pub const LOG_ENV: &str = "TETHER_LOG";
/// Format variable read by [`Config::from_env`].
pub const LOG_FORMAT_ENV: &str = "TETHER_LOG_FORMAT";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filter directives (e.g. `"info"`, `"debug,tether_node=trace"`)
    pub level: String,

    /// Output format
    pub format: Format,

    /// Colored output
    pub ansi: bool,

    /// Include the event target
    pub with_target: bool,

    /// Include file and line
    pub with_source: bool,

    /// Service name; when set every event runs inside a root span carrying it
    pub service: Option<String>,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Human-readable, multi-line
    Pretty,
    /// Single line per event
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Compact,
            ansi: true,
            with_target: true,
            with_source: false,
            service: None,
        }
    }
}

impl Config {
    /// Create configuration from environment variables
    ///
    /// `TETHER_LOG` wins over `RUST_LOG`. An unknown `TETHER_LOG_FORMAT`
    /// falls back to compact.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup(LOG_ENV).or_else(|| lookup("RUST_LOG")) {
            config.level = level;
        }

        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.format = Format::parse(&format).unwrap_or(Format::Compact);
        }

        config
    }

    /// Development configuration (pretty, debug level)
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: Format::Pretty,
            with_source: true,
            ..Self::default()
        }
    }

    /// Production configuration (JSON, info level)
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Json,
            ansi: false,
            ..Self::default()
        }
    }

    /// Test configuration (everything, no colors)
    #[must_use]
    pub fn test() -> Self {
        Self {
            level: "trace".to_string(),
            format: Format::Compact,
            ansi: false,
            ..Self::default()
        }
    }

    /// Set the filter directives.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the service name.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn tether_log_wins_over_rust_log() {
        let config = Config::from_lookup(lookup(&[("TETHER_LOG", "debug"), ("RUST_LOG", "warn")]));
        assert_eq!(config.level, "debug");

        let config = Config::from_lookup(lookup(&[("RUST_LOG", "warn")]));
        assert_eq!(config.level, "warn");
    }

    #[rstest]
    #[case("json", Format::Json)]
    #[case("Pretty", Format::Pretty)]
    #[case("compact", Format::Compact)]
    #[case("logfmt", Format::Compact)]
    fn format_from_env(#[case] raw: &str, #[case] expected: Format) {
        let config = Config::from_lookup(lookup(&[("TETHER_LOG_FORMAT", raw)]));
        assert_eq!(config.format, expected);
    }

    #[test]
    fn empty_environment_is_default() {
        assert_eq!(Config::from_lookup(lookup(&[])), Config::default());
    }

    #[test]
    fn presets() {
        assert_eq!(Config::development().format, Format::Pretty);
        assert!(!Config::production().ansi);
        assert_eq!(Config::test().level, "trace");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"format": "json", "service": "host"}"#).unwrap();
        assert_eq!(config.format, Format::Json);
        assert_eq!(config.service.as_deref(), Some("host"));
        assert_eq!(config.level, "info");
    }
}
