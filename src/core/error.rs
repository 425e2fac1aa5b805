//! Error types for the converter runtime.

use crate::plugin::interface::PluginError;
use crate::plugin::record::{LifecycleOp, PluginState};
use thiserror::Error;

/// Result type alias for converter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in converter operations.
#[derive(Error, Debug)]
pub enum Error {
    // Lifecycle errors
    #[error("Plugin {plugin} failed to {operation}: {source}")]
    Lifecycle {
        plugin: String,
        operation: LifecycleOp,
        #[source]
        source: PluginError,
    },

    #[error("Plugin {plugin} cannot {operation} while {state}")]
    InvalidTransition {
        plugin: String,
        operation: LifecycleOp,
        state: PluginState,
    },

    #[error("Plugin {plugin} failed to convert: {source}")]
    Conversion {
        plugin: String,
        #[source]
        source: PluginError,
    },

    #[error("Plugin excluded by configuration: {0}")]
    Excluded(String),

    #[error("Plugin not enabled: {0}")]
    NotEnabled(String),

    #[error("No plugin selected")]
    NoSelection,

    // Registry errors
    #[error("Plugin already registered: {0}")]
    DuplicatePlugin(String),

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Plugin registry already shut down")]
    RegistryClosed,

    #[error("Plugin discovery failed: {0}")]
    Discovery(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from a plugin hook rather than the runtime.
    pub fn is_plugin_failure(&self) -> bool {
        matches!(self, Error::Lifecycle { .. } | Error::Conversion { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}
