//! Engine error type.

use starling_core::{ConfigError, CoreError};
use starling_store::StoreError;

/// Errors raised by subsystem entry points, the reset runner, and the
/// launcher.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A core protocol failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A store failure outside the core protocol.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Monitor output could not be written.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Monitor records could not be serialized.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The requested subsystem role does not exist.
    #[error("unknown subsystem role: {role}")]
    UnknownRole {
        /// The role that failed to resolve.
        role: String,
    },

    /// The requested model is not registered.
    #[error("unknown model: {name}")]
    UnknownModel {
        /// The spec name that failed to resolve.
        name: String,
    },

    /// A launched subsystem process failed.
    #[error("subsystem process failed: {message}")]
    Launcher {
        /// Description of the failure.
        message: String,
    },
}
