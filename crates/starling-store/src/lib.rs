//! Graph access layer for the Starling simulation framework.
//!
//! The entire world state of a run lives in a shared external graph
//! store; subsystem processes hold no world state of their own. This
//! crate is the only way in: a [`GraphBackend`] trait over primitive,
//! parameterized graph operations, two backends (`PostgreSQL` and
//! in-memory), and the typed [`GraphClient`] every subsystem talks
//! through.
//!
//! ```text
//! subsystem process
//!     |
//!     +-- GraphClient (typed ops, bounded retry)
//!         |
//!         +-- dyn GraphBackend
//!             |-- PostgresBackend  (sqlx, JSONB attrs, delegated algorithms)
//!             +-- MemoryBackend    (petgraph, local runs and tests)
//! ```
//!
//! # Modules
//!
//! - [`backend`] -- The backend trait and community-detection results
//! - [`client`] -- Typed graph operations with retry
//! - [`error`] -- The store error taxonomy (transient vs fatal)
//! - [`memory`] -- In-memory petgraph backend
//! - [`postgres`] -- `PostgreSQL` backend
//! - [`retry`] -- Bounded retry with exponential backoff

pub mod backend;
pub mod client;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod retry;

// Re-export primary types for convenience.
pub use backend::{CommunityAssignment, GraphBackend};
pub use client::GraphClient;
pub use error::StoreError;
pub use memory::MemoryBackend;
pub use postgres::{PostgresBackend, PostgresConfig};
pub use retry::RetryPolicy;
