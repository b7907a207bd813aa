//! Error type for logger setup

/// Errors from building the logger
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Filter directives could not be parsed
    #[error("invalid filter: {0}")]
    Filter(String),

    /// A global subscriber is already installed
    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Result type for logger operations
pub type LogResult<T> = Result<T, LogError>;
