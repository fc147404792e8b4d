//! Entity identifiers and references.
//!
//! Every entity in the store is addressed by an [`EntityRef`]: an
//! identifier, the entity kind, and the name of the property that holds
//! the identifier. There is no global identifier space -- a numeric agent
//! id and a textual node id can collide without ambiguity because the
//! kind disambiguates. The invariant is that `id_field` names a property
//! unique within `kind`; every lookup keys on `(kind, id_field = id)`.

use serde::{Deserialize, Serialize};

/// Well-known entity kind for agents.
pub const KIND_AGENT: &str = "Agent";

/// Well-known entity kind for location nodes.
pub const KIND_NODE: &str = "Node";

/// Well-known entity kind for detected communities.
pub const KIND_CLUSTER: &str = "Cluster";

/// Well-known entity kind for the global clock.
pub const KIND_CLOCK: &str = "Clock";

/// Well-known entity kind for the run tag.
pub const KIND_TAG: &str = "Tag";

/// An entity identifier: either numeric (agents, clusters) or textual
/// (named nodes).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// A numeric identifier.
    Num(i64),
    /// A textual identifier.
    Text(String),
}

impl EntityId {
    /// Return the numeric value, if this identifier is numeric.
    pub const fn as_num(&self) -> Option<i64> {
        match self {
            Self::Num(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Return the textual value, if this identifier is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Num(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        Self::Num(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A reference addressing a single store entity.
///
/// Nodes, agents, clusters, the clock and the tag are all addressed the
/// same way; there is no shared base class in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// The identifier value.
    pub id: EntityId,
    /// The entity kind (label in the store).
    pub kind: String,
    /// The property name holding the identifier. Must be unique within
    /// `kind`.
    pub id_field: String,
}

impl EntityRef {
    /// Create a reference from raw parts.
    pub fn new(id: impl Into<EntityId>, kind: &str, id_field: &str) -> Self {
        Self {
            id: id.into(),
            kind: kind.to_owned(),
            id_field: id_field.to_owned(),
        }
    }

    /// Reference an agent by its numeric id.
    pub fn agent(id: i64) -> Self {
        Self::new(id, KIND_AGENT, "id")
    }

    /// Reference a location node by name.
    pub fn node(name: &str) -> Self {
        Self::new(name, KIND_NODE, "name")
    }

    /// Reference a cluster by its numeric community id.
    pub fn cluster(id: i64) -> Self {
        Self::new(id, KIND_CLUSTER, "id")
    }

    /// Reference the global clock entity.
    pub fn clock() -> Self {
        Self::new(0, KIND_CLOCK, "id")
    }

    /// Reference the run tag entity.
    pub fn tag() -> Self {
        Self::new(0, KIND_TAG, "id")
    }

    /// True if this reference addresses an agent.
    pub fn is_agent(&self) -> bool {
        self.kind == KIND_AGENT
    }
}

impl core::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}[{}={}]", self.kind, self.id_field, self.id)
    }
}
