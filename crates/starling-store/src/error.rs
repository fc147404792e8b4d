//! Error types for the graph access layer.
//!
//! The taxonomy splits along one line that the whole framework depends
//! on: **transient** failures (timeouts, lock contention, stale routing)
//! are retried by [`GraphClient`]; everything else propagates immediately
//! and aborts only the calling cycle.
//!
//! [`GraphClient`]: crate::client::GraphClient

use starling_types::EntityRef;

/// Errors that can occur in the graph access layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A transient store failure. Eligible for retry.
    #[error("transient store failure: {message}")]
    Transient {
        /// Description of the underlying failure.
        message: String,
    },

    /// A lookup that must resolve did not. Fatal to the calling cycle.
    #[error("entity not found: {reference}")]
    MissingEntity {
        /// The reference that failed to resolve.
        reference: EntityRef,
    },

    /// A required attribute was absent from an entity.
    #[error("attribute {attribute:?} missing on {reference}")]
    MissingAttribute {
        /// The entity read.
        reference: EntityRef,
        /// The attribute that was absent.
        attribute: String,
    },

    /// An edge that must exist did not.
    #[error("no {kind} edge from {from} to {to}")]
    MissingEdge {
        /// Source of the expected edge.
        from: EntityRef,
        /// Target of the expected edge.
        to: EntityRef,
        /// The edge kind label.
        kind: &'static str,
    },

    /// The backend cannot perform a delegated operation.
    #[error("operation not supported by this backend: {operation}")]
    Unsupported {
        /// The operation that is unavailable.
        operation: &'static str,
    },

    /// All retry attempts for a transient failure were exhausted.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The last transient failure observed.
        #[source]
        last: Box<StoreError>,
    },

    /// A serialization or deserialization error (queue payloads, JSONB
    /// attribute maps).
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A non-transient backend failure.
    #[error("backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// True if this failure is eligible for retry.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Build a transient error from a displayable cause.
    pub fn transient(cause: impl core::fmt::Display) -> Self {
        Self::Transient {
            message: cause.to_string(),
        }
    }

    /// Build a non-transient backend error from a displayable cause.
    pub fn backend(cause: impl core::fmt::Display) -> Self {
        Self::Backend {
            message: cause.to_string(),
        }
    }
}

/// SQLSTATE codes that indicate transient contention in Postgres:
/// serialization failure, deadlock detected, lock not available.
const TRANSIENT_SQLSTATES: [&str; 3] = ["40001", "40P01", "55P03"];

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::transient(err)
            }
            sqlx::Error::Database(db) => {
                let code = db.code();
                let transient = code
                    .as_deref()
                    .is_some_and(|c| TRANSIENT_SQLSTATES.contains(&c));
                if transient {
                    Self::transient(err)
                } else {
                    Self::backend(err)
                }
            }
            _ => Self::backend(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_variant_is_retryable() {
        assert!(StoreError::transient("timeout").is_transient());
        assert!(!StoreError::backend("bad query").is_transient());
        assert!(
            !StoreError::MissingEntity {
                reference: EntityRef::agent(1),
            }
            .is_transient()
        );
    }

    #[test]
    fn exhaustion_keeps_the_last_cause() {
        let err = StoreError::RetriesExhausted {
            attempts: 4,
            last: Box::new(StoreError::transient("lock contention")),
        };
        let text = err.to_string();
        assert!(text.contains("4 attempts"));
        assert!(text.contains("lock contention"));
    }
}
