//! # Tether Log
//!
//! Logging setup shared by tether hosts, plugins' tests and tools.
//!
//! Everything logs through [`tracing`]; this crate only installs the
//! subscriber: an [`EnvFilter`](tracing_subscriber::EnvFilter) plus one
//! `fmt` layer in the configured [`Format`], writing to stderr.
//!
//! ## Quick Start
//!
//! ```rust
//! fn main() -> Result<(), tether_log::LogError> {
//!     let _guard = tether_log::auto_init()?;
//!     tracing::info!(plugins = 3, "host starting");
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;

// Public API
pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, Format, LOG_ENV, LOG_FORMAT_ENV};
pub use error::{LogError, LogResult};

// ============================================================================
// Initialization Functions
// ============================================================================

/// Auto-detect and initialize the best logging configuration
///
/// Uses the environment when `TETHER_LOG` or `RUST_LOG` is set, otherwise
/// [`Config::development`] in debug builds and [`Config::production`] in
/// release builds.
pub fn auto_init() -> LogResult<LoggerGuard> {
    if std::env::var_os(LOG_ENV).is_some() || std::env::var_os("RUST_LOG").is_some() {
        init_with(Config::from_env())
    } else if cfg!(debug_assertions) {
        init_with(Config::development())
    } else {
        init_with(Config::production())
    }
}

/// Initialize with default configuration
pub fn init() -> LogResult<LoggerGuard> {
    init_with(Config::default())
}

/// Initialize with custom configuration
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}

/// Initialize for tests
///
/// Safe to call from every test: when a global subscriber is already
/// installed this does nothing.
pub fn init_test() -> LogResult<LoggerGuard> {
    if tracing::dispatcher::has_been_set() {
        return Ok(LoggerGuard::noop());
    }
    match init_with(Config::test()) {
        Err(LogError::Init(_)) => Ok(LoggerGuard::noop()),
        other => other,
    }
}
