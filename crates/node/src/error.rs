//! Node error types.

/// Errors from registration, plugin loading and host configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NodeError {
    /// A factory or UI accessor is already registered under this label.
    #[error("node '{0}' is already registered")]
    RegistrationConflict(String),

    /// No factory is registered under this label.
    #[error("node not found: {0}")]
    NotFound(String),

    /// A plugin entry ran but did not register everything it declared.
    #[error(
        "plugin '{module}' registered {registered} of {total} node factories (status {status})"
    )]
    PartialPluginFailure {
        /// Module path or name.
        module: String,
        /// Factories registered.
        registered: i32,
        /// Factories declared.
        total: i32,
        /// Status returned by the entry.
        status: i32,
    },

    /// Library file failed to open.
    #[error("failed to load plugin '{module}': {reason}")]
    Load {
        /// Module path.
        module: String,
        /// The underlying error message.
        reason: String,
    },

    /// The entry symbol was not found in the library.
    #[error("symbol '{symbol}' not found in plugin '{module}': {reason}")]
    SymbolNotFound {
        /// Module path.
        module: String,
        /// The symbol looked up.
        symbol: String,
        /// The underlying error message.
        reason: String,
    },

    /// A panic escaped the plugin entry.
    #[error("panic occurred while registering plugin '{0}'")]
    Panic(String),

    /// Failed to read a plugin directory.
    #[error("directory read error: {0}")]
    DirectoryRead(String),

    /// Host configuration could not be read or parsed.
    #[error("invalid host configuration: {0}")]
    Config(String),
}

impl PartialEq for NodeError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::RegistrationConflict(a), Self::RegistrationConflict(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (
                Self::PartialPluginFailure {
                    module: m1,
                    registered: r1,
                    total: t1,
                    status: s1,
                },
                Self::PartialPluginFailure {
                    module: m2,
                    registered: r2,
                    total: t2,
                    status: s2,
                },
            ) => m1 == m2 && r1 == r2 && t1 == t2 && s1 == s2,
            (
                Self::Load {
                    module: m1,
                    reason: r1,
                },
                Self::Load {
                    module: m2,
                    reason: r2,
                },
            ) => m1 == m2 && r1 == r2,
            (
                Self::SymbolNotFound {
                    module: m1,
                    symbol: s1,
                    ..
                },
                Self::SymbolNotFound {
                    module: m2,
                    symbol: s2,
                    ..
                },
            ) => m1 == m2 && s1 == s2,
            (Self::Panic(a), Self::Panic(b)) => a == b,
            (Self::DirectoryRead(a), Self::DirectoryRead(b)) => a == b,
            (Self::Config(a), Self::Config(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for NodeError {}
