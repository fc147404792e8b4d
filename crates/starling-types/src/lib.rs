//! Shared type definitions for the Starling simulation framework.
//!
//! This crate is the single source of truth for the types that cross
//! crate boundaries in the Starling workspace: entity addressing, store
//! attribute values, edge kinds, node queues, perception payloads, and
//! the run tag.
//!
//! # Modules
//!
//! - [`ids`] -- Entity identifiers and the `(id, kind, id_field)` reference
//! - [`value`] -- Scalar attribute values and attribute maps
//! - [`edge`] -- The closed set of edge kinds
//! - [`queue`] -- Per-node agent itinerary queues
//! - [`view`] -- Perception payloads returned by the store layer
//! - [`tag`] -- The run-identifying tag record

pub mod edge;
pub mod ids;
pub mod queue;
pub mod tag;
pub mod value;
pub mod view;

// Re-export all public types at crate root for convenience.
pub use edge::EdgeKind;
pub use ids::{EntityId, EntityRef};
pub use queue::{NodeQueue, QueuedChoice};
pub use tag::{RunTag, TagParseError};
pub use value::{AttrMap, AttrValue, attrs_from_json, attrs_to_json};
pub use view::{EdgeView, Perception};
