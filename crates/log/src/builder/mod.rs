//! Logger builder implementation

#[macro_use]
mod format;

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Format};
use crate::error::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Guard that keeps the logger's root span entered
///
/// Dropping it exits the service span; the subscriber itself stays
/// installed for the rest of the process.
#[derive(Debug)]
pub struct LoggerGuard {
    _root_span: Option<tracing::span::EnteredSpan>,
}

/// Install `Registry + filter + layer` as the global subscriber.
macro_rules! init_subscriber {
    ($filter:expr, $layer:expr) => {
        Registry::default()
            .with($filter)
            .with($layer)
            .try_init()
            .map_err(|e| LogError::Init(e.to_string()))
    };
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// The configuration this builder installs
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build and install the logger
    ///
    /// # Errors
    ///
    /// [`LogError::Filter`] if the level directives do not parse,
    /// [`LogError::Init`] if a global subscriber is already installed.
    pub fn build(self) -> LogResult<LoggerGuard> {
        let filter = self.filter()?;

        match self.config.format {
            Format::Pretty => init_subscriber!(filter, create_fmt_layer!(pretty, self.config))?,
            Format::Compact => init_subscriber!(filter, create_fmt_layer!(compact, self.config))?,
            Format::Json => init_subscriber!(filter, create_json_layer!(self.config))?,
        }

        let root_span = self
            .config
            .service
            .as_deref()
            .map(|service| tracing::info_span!("service", service).entered());

        Ok(LoggerGuard {
            _root_span: root_span,
        })
    }

    fn filter(&self) -> LogResult<EnvFilter> {
        EnvFilter::try_new(&self.config.level)
            .map_err(|e| LogError::Filter(format!("{}: {e}", self.config.level)))
    }
}

impl LoggerGuard {
    /// Guard for a logger someone else installed.
    pub(crate) fn noop() -> Self {
        Self { _root_span: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_directive_is_a_filter_error() {
        let err = LoggerBuilder::from_config(Config::default().with_level("tether=loudest"))
            .filter()
            .unwrap_err();
        assert!(matches!(err, LogError::Filter(ref msg) if msg.starts_with("tether=loudest")));
    }

    #[test]
    fn directives_with_targets_parse() {
        let builder = LoggerBuilder::from_config(Config::default().with_level("warn,tether_node=debug"));
        assert!(builder.filter().is_ok());
    }
}
