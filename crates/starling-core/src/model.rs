//! The model registry.
//!
//! A model bundles everything run-specific: how to build an agent
//! object from its id, the node set, the service registry, the model's
//! intervenors, and the reset hooks that lay down the starting world.
//! One model object is constructed by the launcher and passed by
//! reference into every subsystem entry point; there is no global
//! mutable specification.

use async_trait::async_trait;
use starling_store::GraphClient;
use starling_types::{AttrValue, EntityRef};

use crate::agent::{CommunicativeAgent, MobileAgent};
use crate::error::CoreError;
use crate::intervenor::Intervenor;
use crate::node::SimNode;
use crate::service::Service;

/// A complete simulation model.
#[async_trait]
pub trait Model: Send + Sync {
    /// The model's specification name, recorded in the run tag.
    fn name(&self) -> &str;

    /// The model's node set. Fresh objects each call; nodes hold no
    /// state outside the store.
    fn nodes(&self) -> Vec<Box<dyn SimNode>>;

    /// Build the movement behaviour for an agent id.
    fn agent(&self, id: i64) -> Box<dyn MobileAgent>;

    /// Build the social behaviour for an agent id, if the model has
    /// one.
    fn social_agent(&self, id: i64) -> Option<Box<dyn CommunicativeAgent>> {
        let _ = id;
        None
    }

    /// The services offered at a node, applied to each arriving agent.
    fn services_at(&self, node: &EntityRef) -> Vec<Box<dyn Service>> {
        let _ = node;
        Vec::new()
    }

    /// Build the intervenor for a subsystem role (`population`,
    /// `balancer`, `structure`, or a model-specific name).
    fn intervenor(&self, role: &str) -> Option<Box<dyn Intervenor>> {
        let _ = role;
        None
    }

    /// Reset hook: create the node entities. The default writes each
    /// node with its advertised capacity and duration.
    async fn set_nodes(&self, client: &GraphClient) -> Result<(), CoreError> {
        for node in self.nodes() {
            let mut attrs = starling_types::AttrMap::new();
            if let Some(capacity) = node.capacity() {
                attrs.insert("capacity".to_owned(), AttrValue::Int(capacity));
            }
            let duration = i64::try_from(node.duration()).unwrap_or(i64::MAX);
            attrs.insert("duration".to_owned(), AttrValue::Int(duration));
            client.create_entity(&node.entity(), attrs).await?;
        }
        Ok(())
    }

    /// Reset hook: create the movement edges between nodes.
    async fn set_edges(&self, client: &GraphClient) -> Result<(), CoreError> {
        let _ = client;
        Ok(())
    }

    /// Reset hook: install the service entities, if the model has any.
    async fn set_services(&self, client: &GraphClient) -> Result<(), CoreError> {
        let _ = client;
        Ok(())
    }

    /// Reset hook: create the starting population.
    async fn generate_population(&self, client: &GraphClient, size: u64) -> Result<(), CoreError> {
        let _ = (client, size);
        Ok(())
    }
}
