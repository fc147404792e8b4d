//! Shared error type for the simulation core.

use starling_store::StoreError;

/// Errors raised by core protocol code and model hooks.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A queue payload could not be read or written.
    #[error("queue serialization error: {0}")]
    Queue(#[from] serde_json::Error),

    /// A model hook reported a logical failure.
    #[error("model error: {message}")]
    Model {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Build a model-hook error from a displayable cause.
    pub fn model(cause: impl core::fmt::Display) -> Self {
        Self::Model {
            message: cause.to_string(),
        }
    }
}
