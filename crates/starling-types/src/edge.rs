//! The closed set of edge kinds used by the simulation.

use serde::{Deserialize, Serialize};

/// Kind label of a store edge.
///
/// Movement edges connect nodes, containment edges bind an agent to its
/// single current node, social edges connect agents, and group edges
/// connect clusters to their member agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Movement edge between two nodes.
    Reaches,
    /// Containment edge from an agent to its current node.
    Located,
    /// Social tie between two agents.
    Social,
    /// Group membership from a cluster to an agent.
    Grouped,
}

impl EdgeKind {
    /// The store label for this edge kind.
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Reaches => "REACHES",
            Self::Located => "LOCATED",
            Self::Social => "SOCIAL",
            Self::Grouped => "GROUPED",
        }
    }

    /// Parse a store label back into an edge kind.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "REACHES" => Some(Self::Reaches),
            "LOCATED" => Some(Self::Located),
            "SOCIAL" => Some(Self::Social),
            "GROUPED" => Some(Self::Grouped),
            _ => None,
        }
    }
}

impl core::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_label())
    }
}
