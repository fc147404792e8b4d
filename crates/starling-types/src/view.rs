//! Perception payloads returned by the store layer.
//!
//! Perception is the agent's view of its local environment: the node it
//! is located at and the outgoing movement edges from that node. The
//! store layer assembles the payload; node and agent filtering narrow it
//! before a choice is made.

use serde::{Deserialize, Serialize};

use crate::ids::EntityRef;
use crate::value::AttrMap;

/// One candidate movement edge as seen by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeView {
    /// The destination entity.
    pub destination: EntityRef,
    /// Attributes on the edge itself (cost, capacity, strength).
    pub edge_attrs: AttrMap,
    /// Attributes on the destination entity at read time.
    pub dest_attrs: AttrMap,
}

impl EdgeView {
    /// The edge's own cost attribute, defaulting to zero when absent.
    pub fn edge_cost(&self) -> f64 {
        self.edge_attrs
            .get("cost")
            .and_then(super::value::AttrValue::as_f64)
            .unwrap_or(0.0)
    }

    /// The destination's cost attribute, defaulting to zero when absent.
    pub fn destination_cost(&self) -> f64 {
        self.dest_attrs
            .get("cost")
            .and_then(super::value::AttrValue::as_f64)
            .unwrap_or(0.0)
    }
}

/// An agent's local environment: its current node plus the outgoing
/// movement edges from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perception {
    /// The node the agent is currently located at.
    pub node: EntityRef,
    /// Attributes of the current node at read time.
    pub node_attrs: AttrMap,
    /// Candidate outgoing movement edges.
    pub edges: Vec<EdgeView>,
}
