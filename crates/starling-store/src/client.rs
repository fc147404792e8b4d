//! Typed graph operations over a backend, with retry.
//!
//! [`GraphClient`] is the handle every subsystem holds. It wraps an
//! `Arc<dyn GraphBackend>` together with a [`RetryPolicy`] and exposes
//! the simulation's vocabulary of operations (locate an agent, read a
//! perception, tick the clock) instead of raw entity primitives. Every
//! backend call runs under the retry loop, so transient store failures
//! are absorbed up to the configured budget and anything else
//! propagates untouched.
//!
//! Writes are immediately visible to all subsystems; the client keeps
//! no cache. Only [`relocate_agent`] is composite-atomic (it is a
//! single backend operation); every other client call is one or more
//! independent primitives.
//!
//! [`relocate_agent`]: GraphClient::relocate_agent

use std::sync::Arc;

use starling_types::ids::{KIND_AGENT, KIND_CLUSTER, KIND_NODE};
use starling_types::{
    AttrMap, AttrValue, EdgeKind, EdgeView, EntityRef, Perception, RunTag,
};
use tracing::debug;

use crate::backend::{CommunityAssignment, GraphBackend};
use crate::error::StoreError;
use crate::retry::{RetryPolicy, with_retries};

/// Attribute under which the clock entity stores the current time.
const TIME_ATTR: &str = "time";
/// Attribute under which the tag entity stores the formatted run tag.
const TAG_ATTR: &str = "tag";

/// Shared handle to the world graph.
///
/// Cheap to clone; clones share the backend and policy.
#[derive(Clone)]
pub struct GraphClient {
    backend: Arc<dyn GraphBackend>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    /// Wrap a backend with the given retry policy.
    pub fn new(backend: Arc<dyn GraphBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Wrap a backend with the default retry policy.
    pub fn with_defaults(backend: Arc<dyn GraphBackend>) -> Self {
        Self::new(backend, RetryPolicy::default())
    }

    // ----- nodes -----

    /// Read all attributes of a node.
    ///
    /// # Errors
    ///
    /// Fails if the node does not exist or the store is unreachable
    /// beyond the retry budget.
    pub async fn get_node(&self, node: &EntityRef) -> Result<AttrMap, StoreError> {
        with_retries(&self.policy, "get_node", || self.backend.get_entity(node)).await
    }

    /// The agents currently located at a node.
    ///
    /// # Errors
    ///
    /// Fails if the node does not exist.
    pub async fn get_node_agents(&self, node: &EntityRef) -> Result<Vec<EntityRef>, StoreError> {
        let occupants = with_retries(&self.policy, "get_node_agents", || {
            self.backend.in_neighbors(node, EdgeKind::Located)
        })
        .await?;
        Ok(occupants.into_iter().map(|(r, _)| r).collect())
    }

    /// Read one attribute of a node.
    ///
    /// # Errors
    ///
    /// Fails if the node does not exist.
    pub async fn get_node_value(
        &self,
        node: &EntityRef,
        attribute: &str,
    ) -> Result<Option<AttrValue>, StoreError> {
        with_retries(&self.policy, "get_node_value", || {
            self.backend.get_attribute(node, attribute)
        })
        .await
    }

    /// Write one attribute of a node.
    ///
    /// # Errors
    ///
    /// Fails if the node does not exist.
    pub async fn update_node(
        &self,
        node: &EntityRef,
        attribute: &str,
        value: AttrValue,
    ) -> Result<(), StoreError> {
        with_retries(&self.policy, "update_node", || {
            self.backend.set_attribute(node, attribute, value.clone())
        })
        .await
    }

    // ----- agents -----

    /// Write one attribute of an agent.
    ///
    /// # Errors
    ///
    /// Fails if the agent does not exist.
    pub async fn update_agent(
        &self,
        agent: &EntityRef,
        attribute: &str,
        value: AttrValue,
    ) -> Result<(), StoreError> {
        with_retries(&self.policy, "update_agent", || {
            self.backend.set_attribute(agent, attribute, value.clone())
        })
        .await
    }

    /// Read one attribute of an agent.
    ///
    /// # Errors
    ///
    /// Fails if the agent does not exist.
    pub async fn get_agent_value(
        &self,
        agent: &EntityRef,
        attribute: &str,
    ) -> Result<Option<AttrValue>, StoreError> {
        with_retries(&self.policy, "get_agent_value", || {
            self.backend.get_attribute(agent, attribute)
        })
        .await
    }

    /// Create a new agent at a node, allocating the next numeric id.
    ///
    /// # Errors
    ///
    /// Fails if the node does not exist.
    pub async fn add_agent(
        &self,
        node: &EntityRef,
        attrs: AttrMap,
    ) -> Result<EntityRef, StoreError> {
        let next = with_retries(&self.policy, "max_numeric_id", || {
            self.backend.max_numeric_id(KIND_AGENT)
        })
        .await?
        .map_or(0, |max| max.saturating_add(1));
        let agent = EntityRef::agent(next);
        with_retries(&self.policy, "create_agent", || {
            self.backend.create_entity(&agent, attrs.clone())
        })
        .await?;
        with_retries(&self.policy, "locate_new_agent", || {
            self.backend
                .create_edge(&agent, node, EdgeKind::Located, AttrMap::new())
        })
        .await?;
        debug!(agent = %agent, node = %node, "agent added");
        Ok(agent)
    }

    /// Remove an agent and all its edges.
    ///
    /// # Errors
    ///
    /// Fails if the agent does not exist.
    pub async fn delete_agent(&self, agent: &EntityRef) -> Result<(), StoreError> {
        with_retries(&self.policy, "delete_agent", || {
            self.backend.delete_entity(agent)
        })
        .await
    }

    /// Atomically replace the agent's location edge.
    ///
    /// # Errors
    ///
    /// Fails if either entity does not exist.
    pub async fn relocate_agent(
        &self,
        agent: &EntityRef,
        destination: &EntityRef,
    ) -> Result<(), StoreError> {
        with_retries(&self.policy, "relocate_agent", || {
            self.backend.relocate_agent(agent, destination)
        })
        .await
    }

    /// The node an agent is currently located at.
    ///
    /// # Errors
    ///
    /// Fails if the agent does not exist or has no location edge.
    pub async fn locate_agent(&self, agent: &EntityRef) -> Result<EntityRef, StoreError> {
        let located = with_retries(&self.policy, "locate_agent", || {
            self.backend.out_neighbors(agent, EdgeKind::Located)
        })
        .await?;
        located
            .into_iter()
            .next()
            .map(|(node, _)| node)
            .ok_or_else(|| StoreError::MissingEdge {
                from: agent.clone(),
                to: EntityRef::node("?"),
                kind: EdgeKind::Located.as_label(),
            })
    }

    /// The other agents located at the same node as `agent`.
    ///
    /// # Errors
    ///
    /// Fails if the agent does not exist or has no location edge.
    pub async fn colocated(&self, agent: &EntityRef) -> Result<Vec<EntityRef>, StoreError> {
        let node = self.locate_agent(agent).await?;
        let mut occupants = self.get_node_agents(&node).await?;
        occupants.retain(|r| r != agent);
        Ok(occupants)
    }

    /// An agent's local environment: its current node and the outgoing
    /// movement edges from it, with edge and destination attributes.
    ///
    /// # Errors
    ///
    /// Fails if the agent does not exist or has no location edge.
    pub async fn perception(&self, agent: &EntityRef) -> Result<Perception, StoreError> {
        let node = self.locate_agent(agent).await?;
        let node_attrs = self.get_node(&node).await?;
        let reaches = with_retries(&self.policy, "perception_edges", || {
            self.backend.out_neighbors(&node, EdgeKind::Reaches)
        })
        .await?;
        let mut edges = Vec::with_capacity(reaches.len());
        for (destination, edge_attrs) in reaches {
            let dest_attrs = with_retries(&self.policy, "perception_dest", || {
                self.backend.get_entity(&destination)
            })
            .await?;
            edges.push(EdgeView {
                destination,
                edge_attrs,
                dest_attrs,
            });
        }
        Ok(Perception {
            node,
            node_attrs,
            edges,
        })
    }

    // ----- edges -----

    /// Create an edge.
    ///
    /// # Errors
    ///
    /// Fails if either endpoint does not exist.
    pub async fn create_edge(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        attrs: AttrMap,
    ) -> Result<(), StoreError> {
        with_retries(&self.policy, "create_edge", || {
            self.backend.create_edge(from, to, kind, attrs.clone())
        })
        .await
    }

    /// Delete all matching edges, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Fails if either endpoint does not exist.
    pub async fn delete_edge(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
    ) -> Result<u64, StoreError> {
        with_retries(&self.policy, "delete_edge", || {
            self.backend.delete_edge(from, to, kind)
        })
        .await
    }

    /// Write one attribute on an existing edge.
    ///
    /// # Errors
    ///
    /// Fails if the edge does not exist.
    pub async fn update_edge(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        attribute: &str,
        value: AttrValue,
    ) -> Result<(), StoreError> {
        with_retries(&self.policy, "update_edge", || {
            self.backend
                .set_edge_attribute(from, to, kind, attribute, value.clone())
        })
        .await
    }

    /// Read one attribute from an edge.
    ///
    /// # Errors
    ///
    /// Fails if either endpoint does not exist.
    pub async fn get_edge_value(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        attribute: &str,
    ) -> Result<Option<AttrValue>, StoreError> {
        with_retries(&self.policy, "get_edge_value", || {
            self.backend.get_edge_attribute(from, to, kind, attribute)
        })
        .await
    }

    // ----- social -----

    /// The agents this agent has outgoing social edges to, with the edge
    /// attributes.
    ///
    /// # Errors
    ///
    /// Fails if the agent does not exist.
    pub async fn agent_contacts(
        &self,
        agent: &EntityRef,
    ) -> Result<Vec<(EntityRef, AttrMap)>, StoreError> {
        with_retries(&self.policy, "agent_contacts", || {
            self.backend.out_neighbors(agent, EdgeKind::Social)
        })
        .await
    }

    /// All social edges touching this agent, in either direction.
    ///
    /// # Errors
    ///
    /// Fails if the agent does not exist.
    pub async fn agent_relationships(
        &self,
        agent: &EntityRef,
    ) -> Result<Vec<(EntityRef, AttrMap)>, StoreError> {
        let mut all = self.agent_contacts(agent).await?;
        let incoming = with_retries(&self.policy, "agent_relationships", || {
            self.backend.in_neighbors(agent, EdgeKind::Social)
        })
        .await?;
        all.extend(incoming);
        Ok(all)
    }

    /// Write one attribute on an existing social edge.
    ///
    /// # Errors
    ///
    /// Fails if the edge does not exist.
    pub async fn update_contact_edge(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        attribute: &str,
        value: AttrValue,
    ) -> Result<(), StoreError> {
        self.update_edge(from, to, EdgeKind::Social, attribute, value)
            .await
    }

    /// Remove the social edges between two agents.
    ///
    /// # Errors
    ///
    /// Fails if either agent does not exist.
    pub async fn delete_contact(
        &self,
        from: &EntityRef,
        to: &EntityRef,
    ) -> Result<u64, StoreError> {
        self.delete_edge(from, to, EdgeKind::Social).await
    }

    // ----- delegated algorithms -----

    /// Cheapest movement-path cost between two nodes.
    ///
    /// # Errors
    ///
    /// Fails if either node does not exist or no path exists.
    pub async fn shortest_path(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        directed: bool,
    ) -> Result<f64, StoreError> {
        with_retries(&self.policy, "shortest_path", || {
            self.backend.shortest_path(from, to, EdgeKind::Reaches, directed)
        })
        .await
    }

    /// Cheapest social-path cost between two agents, ignoring direction.
    ///
    /// # Errors
    ///
    /// Fails if either agent does not exist or no path exists.
    pub async fn shortest_social_path(
        &self,
        from: &EntityRef,
        to: &EntityRef,
    ) -> Result<f64, StoreError> {
        with_retries(&self.policy, "shortest_social_path", || {
            self.backend.shortest_path(from, to, EdgeKind::Social, false)
        })
        .await
    }

    /// Community detection over the social graph, optionally seeded by a
    /// previous run's assignments.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot delegate the algorithm.
    pub async fn louvain(
        &self,
        seed_attribute: Option<&str>,
    ) -> Result<Vec<CommunityAssignment>, StoreError> {
        with_retries(&self.policy, "louvain", || {
            self.backend
                .community_detection(KIND_AGENT, EdgeKind::Social, seed_attribute)
        })
        .await
    }

    // ----- clusters -----

    /// The clusters an agent is currently grouped into.
    ///
    /// # Errors
    ///
    /// Fails if the agent does not exist.
    pub async fn check_groupings(&self, agent: &EntityRef) -> Result<Vec<EntityRef>, StoreError> {
        let grouped = with_retries(&self.policy, "check_groupings", || {
            self.backend.in_neighbors(agent, EdgeKind::Grouped)
        })
        .await?;
        Ok(grouped.into_iter().map(|(r, _)| r).collect())
    }

    /// The agents grouped into a cluster.
    ///
    /// # Errors
    ///
    /// Fails if the cluster does not exist.
    pub async fn agents_in_cluster(
        &self,
        cluster: &EntityRef,
    ) -> Result<Vec<EntityRef>, StoreError> {
        let grouped = with_retries(&self.policy, "agents_in_cluster", || {
            self.backend.out_neighbors(cluster, EdgeKind::Grouped)
        })
        .await?;
        Ok(grouped.into_iter().map(|(r, _)| r).collect())
    }

    /// Every cluster entity currently in the system.
    ///
    /// # Errors
    ///
    /// Fails if the store is unreachable beyond the retry budget.
    pub async fn clusters_in_system(&self) -> Result<Vec<EntityRef>, StoreError> {
        with_retries(&self.policy, "clusters_in_system", || {
            self.backend.entities_of_kind(KIND_CLUSTER)
        })
        .await
    }

    // ----- clock and tag -----

    /// Read the current simulation time.
    ///
    /// # Errors
    ///
    /// Fails if the clock entity or its time attribute is absent.
    pub async fn get_time(&self) -> Result<u64, StoreError> {
        let clock = EntityRef::clock();
        let value = with_retries(&self.policy, "get_time", || {
            self.backend.get_attribute(&clock, TIME_ATTR)
        })
        .await?;
        let time = value
            .as_ref()
            .and_then(AttrValue::as_i64)
            .ok_or_else(|| StoreError::MissingAttribute {
                reference: clock,
                attribute: TIME_ATTR.to_owned(),
            })?;
        u64::try_from(time).map_err(|_| StoreError::backend("negative clock value"))
    }

    /// Advance the clock by one generation, returning the new time.
    ///
    /// Read-increment-write; correct under the single-driver contract.
    ///
    /// # Errors
    ///
    /// Fails if the clock entity is absent.
    pub async fn tick(&self) -> Result<u64, StoreError> {
        let now = self.get_time().await?;
        let next = now.saturating_add(1);
        self.set_clock(next).await?;
        Ok(next)
    }

    /// Set the clock to an absolute value, creating the clock entity if
    /// it is not present yet.
    ///
    /// # Errors
    ///
    /// Fails if the store is unreachable beyond the retry budget.
    pub async fn set_clock(&self, time: u64) -> Result<(), StoreError> {
        let clock = EntityRef::clock();
        self.ensure_entity(&clock).await?;
        let value = i64::try_from(time).map_err(|_| StoreError::backend("clock overflow"))?;
        with_retries(&self.policy, "set_clock", || {
            self.backend
                .set_attribute(&clock, TIME_ATTR, AttrValue::Int(value))
        })
        .await
    }

    /// Write the run tag, creating the tag entity if needed.
    ///
    /// # Errors
    ///
    /// Fails if the store is unreachable beyond the retry budget.
    pub async fn set_tag(&self, tag: &RunTag) -> Result<(), StoreError> {
        let reference = EntityRef::tag();
        self.ensure_entity(&reference).await?;
        with_retries(&self.policy, "set_tag", || {
            self.backend
                .set_attribute(&reference, TAG_ATTR, AttrValue::Text(tag.format()))
        })
        .await
    }

    /// Read the stored run tag back.
    ///
    /// # Errors
    ///
    /// Fails if the tag entity is absent or its value is malformed.
    pub async fn get_run_tag(&self) -> Result<RunTag, StoreError> {
        let reference = EntityRef::tag();
        let value = with_retries(&self.policy, "get_run_tag", || {
            self.backend.get_attribute(&reference, TAG_ATTR)
        })
        .await?;
        let raw = value
            .as_ref()
            .and_then(AttrValue::as_str)
            .ok_or_else(|| StoreError::MissingAttribute {
                reference,
                attribute: TAG_ATTR.to_owned(),
            })?
            .to_owned();
        RunTag::parse(&raw).map_err(|e| StoreError::backend(e.to_string()))
    }

    /// The stored run name, used to name monitor output.
    ///
    /// # Errors
    ///
    /// Fails if the tag entity is absent.
    pub async fn get_run_name(&self) -> Result<String, StoreError> {
        Ok(self.get_run_tag().await?.format())
    }

    /// The population size recorded in the run tag.
    ///
    /// # Errors
    ///
    /// Fails if the tag entity is absent.
    pub async fn get_pop_size(&self) -> Result<u64, StoreError> {
        Ok(self.get_run_tag().await?.pop_size)
    }

    /// The run length recorded in the run tag.
    ///
    /// # Errors
    ///
    /// Fails if the tag entity is absent.
    pub async fn get_run_length(&self) -> Result<u64, StoreError> {
        Ok(self.get_run_tag().await?.run_length)
    }

    /// Remove every entity and edge. Reset only.
    ///
    /// # Errors
    ///
    /// Fails if the store is unreachable beyond the retry budget.
    pub async fn clear_database(&self) -> Result<(), StoreError> {
        with_retries(&self.policy, "clear_database", || self.backend.clear()).await
    }

    /// Create a node entity with attributes. Reset only.
    ///
    /// # Errors
    ///
    /// Fails if the entity already exists.
    pub async fn create_entity(
        &self,
        reference: &EntityRef,
        attrs: AttrMap,
    ) -> Result<(), StoreError> {
        with_retries(&self.policy, "create_entity", || {
            self.backend.create_entity(reference, attrs.clone())
        })
        .await
    }

    /// Whether an entity exists.
    ///
    /// # Errors
    ///
    /// Fails if the store is unreachable beyond the retry budget.
    pub async fn entity_exists(&self, reference: &EntityRef) -> Result<bool, StoreError> {
        with_retries(&self.policy, "entity_exists", || {
            self.backend.entity_exists(reference)
        })
        .await
    }

    /// Every node entity currently in the system.
    ///
    /// # Errors
    ///
    /// Fails if the store is unreachable beyond the retry budget.
    pub async fn nodes_in_system(&self) -> Result<Vec<EntityRef>, StoreError> {
        with_retries(&self.policy, "nodes_in_system", || {
            self.backend.entities_of_kind(KIND_NODE)
        })
        .await
    }

    /// Every agent entity currently in the system.
    ///
    /// # Errors
    ///
    /// Fails if the store is unreachable beyond the retry budget.
    pub async fn agents_in_system(&self) -> Result<Vec<EntityRef>, StoreError> {
        with_retries(&self.policy, "agents_in_system", || {
            self.backend.entities_of_kind(KIND_AGENT)
        })
        .await
    }

    async fn ensure_entity(&self, reference: &EntityRef) -> Result<(), StoreError> {
        if !self.entity_exists(reference).await? {
            self.create_entity(reference, AttrMap::new()).await?;
        }
        Ok(())
    }
}
