//! Incremental clustering over the social graph.
//!
//! Communities in the agents' social graph are materialised as cluster
//! entities joined to their members by grouping edges. The work is
//! split between an intervenor that tracks community detection output
//! incrementally and a maintenance pass that prunes memberships by
//! strength.
//!
//! # Modules
//!
//! - [`intervenor`] -- The clustering intervenor and strength updates
//! - [`orientation`] -- Strength-based pruning and seed repointing

pub mod intervenor;
pub mod orientation;

pub use intervenor::{ClusterIntervenor, SEED_ATTR, STRENGTH_ATTR, update_cluster_strength};
pub use orientation::{StrengthOrdering, update_cluster_orientation};
