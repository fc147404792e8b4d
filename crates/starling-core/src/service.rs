//! Node-attached services.
//!
//! A service is something a node offers arriving agents: treatment,
//! teaching, trade. Services are looked up through the model's registry
//! keyed by destination identity, typically from an agent's `learn`
//! hook after a move.

use async_trait::async_trait;
use starling_store::GraphClient;
use starling_types::EntityRef;

use crate::error::CoreError;

/// A model-defined service offered at a node.
#[async_trait]
pub trait Service: Send + Sync {
    /// The service's unique name.
    fn name(&self) -> &str;

    /// Category label the model uses to group services.
    fn service_type(&self) -> &str;

    /// How many agents can use the service per generation, if limited.
    fn capacity(&self) -> Option<i64> {
        None
    }

    /// Apply the service to one agent.
    async fn provide(&self, client: &GraphClient, user: &EntityRef) -> Result<(), CoreError>;
}
