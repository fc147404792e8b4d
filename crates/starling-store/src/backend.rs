//! The backend trait: primitive, parameterized store operations.
//!
//! Every operation takes entity references and attribute names -- never
//! raw query fragments -- so a backend can bind them as parameters. The
//! trait assumes nothing about concurrency isolation beyond what the
//! backing store gives a single operation; the one deliberate exception
//! is [`relocate_agent`], which must atomically replace the agent's sole
//! outgoing location edge.
//!
//! The two delegated graph algorithms -- path cost and community
//! detection -- belong to the store, not the framework. Backends that
//! cannot delegate them return [`StoreError::Unsupported`].
//!
//! [`relocate_agent`]: GraphBackend::relocate_agent

use async_trait::async_trait;
use starling_types::{AttrMap, AttrValue, EdgeKind, EntityRef};

use crate::error::StoreError;

/// One agent's community assignment as reported by the store's
/// community-detection algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityAssignment {
    /// The agent (or node) assigned.
    pub entity: EntityRef,
    /// The final community id.
    pub final_community: i64,
    /// Intermediate community ids, for hierarchical algorithms that
    /// report them. May be empty.
    pub intermediate: Vec<i64>,
}

impl CommunityAssignment {
    /// The deduplicated set of all communities this entity belongs to,
    /// final and intermediate.
    pub fn all_communities(&self) -> Vec<i64> {
        let mut all = vec![self.final_community];
        for &c in &self.intermediate {
            if !all.contains(&c) {
                all.push(c);
            }
        }
        all
    }
}

/// Primitive operations every graph backend provides.
///
/// Backends are shared across tasks; all methods take `&self` and
/// internal synchronization is the backend's concern. Writes must be
/// visible to subsequent reads from any handle.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    // -- entities ---------------------------------------------------------

    /// Read all attributes of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingEntity`] if the reference does not
    /// resolve.
    async fn get_entity(&self, reference: &EntityRef) -> Result<AttrMap, StoreError>;

    /// True if the reference resolves.
    async fn entity_exists(&self, reference: &EntityRef) -> Result<bool, StoreError>;

    /// Create an entity with the given attributes. The `id_field`
    /// attribute is written from the reference itself.
    async fn create_entity(
        &self,
        reference: &EntityRef,
        attrs: AttrMap,
    ) -> Result<(), StoreError>;

    /// Delete an entity and every edge attached to it.
    async fn delete_entity(&self, reference: &EntityRef) -> Result<(), StoreError>;

    /// Set one attribute on an entity.
    async fn set_attribute(
        &self,
        reference: &EntityRef,
        name: &str,
        value: AttrValue,
    ) -> Result<(), StoreError>;

    /// Read one attribute from an entity, `None` if unset.
    async fn get_attribute(
        &self,
        reference: &EntityRef,
        name: &str,
    ) -> Result<Option<AttrValue>, StoreError>;

    /// The highest numeric id in use for a kind, if any. Used to
    /// allocate the next agent id.
    async fn max_numeric_id(&self, kind: &str) -> Result<Option<i64>, StoreError>;

    /// All entities of a kind.
    async fn entities_of_kind(&self, kind: &str) -> Result<Vec<EntityRef>, StoreError>;

    // -- edges ------------------------------------------------------------

    /// Create an edge of the given kind with attributes.
    async fn create_edge(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        attrs: AttrMap,
    ) -> Result<(), StoreError>;

    /// Delete the edge of the given kind between two entities. Returns
    /// how many edges were removed.
    async fn delete_edge(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
    ) -> Result<u64, StoreError>;

    /// True if an edge of the given kind exists between the entities.
    async fn edge_exists(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
    ) -> Result<bool, StoreError>;

    /// Set one attribute on an existing edge.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingEdge`] if the edge does not exist.
    async fn set_edge_attribute(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        name: &str,
        value: AttrValue,
    ) -> Result<(), StoreError>;

    /// Read one attribute from an edge, `None` if unset.
    async fn get_edge_attribute(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        name: &str,
    ) -> Result<Option<AttrValue>, StoreError>;

    /// Outgoing neighbors over one edge kind: the far entity plus the
    /// edge's attributes.
    async fn out_neighbors(
        &self,
        reference: &EntityRef,
        kind: EdgeKind,
    ) -> Result<Vec<(EntityRef, AttrMap)>, StoreError>;

    /// Incoming neighbors over one edge kind.
    async fn in_neighbors(
        &self,
        reference: &EntityRef,
        kind: EdgeKind,
    ) -> Result<Vec<(EntityRef, AttrMap)>, StoreError>;

    // -- composite --------------------------------------------------------

    /// Atomically replace the agent's single outgoing location edge with
    /// one to `destination`. The delete and create are one logical
    /// operation: no observer may see the agent with zero or two
    /// location edges.
    async fn relocate_agent(
        &self,
        agent: &EntityRef,
        destination: &EntityRef,
    ) -> Result<(), StoreError>;

    // -- delegated algorithms ---------------------------------------------

    /// Total path cost between two entities over a named edge kind,
    /// delegated to the store's native path algorithm. Edge cost falls
    /// back to 1 where no `cost` attribute is set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingEntity`] if either endpoint is
    /// absent, or a backend error if no path exists.
    async fn shortest_path(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        directed: bool,
    ) -> Result<f64, StoreError>;

    /// Community detection over entities of `node_kind` connected by
    /// `edge_kind`, optionally seeded by a named attribute recording
    /// each entity's previous community.
    async fn community_detection(
        &self,
        node_kind: &str,
        edge_kind: EdgeKind,
        seed_attribute: Option<&str>,
    ) -> Result<Vec<CommunityAssignment>, StoreError>;

    // -- maintenance ------------------------------------------------------

    /// Remove every entity and edge from the store.
    async fn clear(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_communities_dedupes_and_keeps_final_first() {
        let assignment = CommunityAssignment {
            entity: EntityRef::agent(1),
            final_community: 4,
            intermediate: vec![4, 7, 7, 2],
        };
        assert_eq!(assignment.all_communities(), vec![4, 7, 2]);
    }
}
