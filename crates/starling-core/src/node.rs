//! The node contract.
//!
//! Nodes are the places agents occupy. Each generation the flow driver
//! asks every node to ready its agents: gather the occupants, build
//! each one's filtered perception, and run its step pipeline. Nodes
//! that predict behaviour instead commit each new arrival's full future
//! itinerary into a queue and replay the entries due this generation.
//!
//! The queue lives in the store as a JSON attribute on the node, so
//! every process sees the same itineraries.

use async_trait::async_trait;
use starling_store::{GraphClient, StoreError};
use starling_types::{AttrValue, EntityRef, NodeQueue, Perception, QueuedChoice};
use tracing::{debug, warn};

use crate::agent::MoveOutcome;
use crate::error::CoreError;
use crate::model::Model;

/// Node attribute holding the serialized queue.
const QUEUE_ATTR: &str = "queue";

/// Agent attribute recording the last generation the agent was stepped.
/// Guards against double-stepping when an agent moves to a node readied
/// later in the same generation.
const STEPPED_ATTR: &str = "steppedAt";

/// A model-defined simulation node.
#[async_trait]
pub trait SimNode: Send + Sync {
    /// The node's unique name.
    fn name(&self) -> &str;

    /// Occupancy limit advertised to perception filtering, if any.
    fn capacity(&self) -> Option<i64> {
        None
    }

    /// How many ticks an arriving agent waits before leaving. Only
    /// meaningful for queue nodes.
    fn duration(&self) -> u64 {
        0
    }

    /// Whether this node commits itineraries to a queue instead of
    /// running the choice pipeline every generation.
    fn uses_queue(&self) -> bool {
        false
    }

    /// The node's store reference.
    fn entity(&self) -> EntityRef {
        EntityRef::node(self.name())
    }

    /// Commit an unqueued agent's future itinerary: absolute departure
    /// ticks paired with the committed choice. Queue nodes only.
    async fn predict(
        &self,
        client: &GraphClient,
        agent: &EntityRef,
        time: u64,
    ) -> Result<Vec<(u64, QueuedChoice)>, CoreError> {
        let _ = (client, agent, time);
        Ok(Vec::new())
    }

    /// Build one agent's filtered view of this node's outgoing movement
    /// edges.
    ///
    /// The default filter removes destinations already at capacity and
    /// edges the agent cannot afford (edge cost plus destination cost
    /// against the agent's `resources` attribute). An empty view means
    /// the agent sits this generation out; it is not an error.
    async fn agent_perception(
        &self,
        client: &GraphClient,
        agent: &EntityRef,
    ) -> Result<Perception, CoreError> {
        let view = client.perception(agent).await?;
        let resources = client
            .get_agent_value(agent, "resources")
            .await?
            .as_ref()
            .and_then(AttrValue::as_f64);

        let mut edges = Vec::with_capacity(view.edges.len());
        for edge in view.edges {
            if let Some(capacity) = edge
                .dest_attrs
                .get("capacity")
                .and_then(AttrValue::as_i64)
            {
                let occupants = client.get_node_agents(&edge.destination).await?;
                let load = i64::try_from(occupants.len()).unwrap_or(i64::MAX);
                if load >= capacity {
                    continue;
                }
            }
            if let Some(budget) = resources {
                if edge.edge_cost() + edge.destination_cost() > budget {
                    continue;
                }
            }
            edges.push(edge);
        }
        Ok(Perception {
            node: view.node,
            node_attrs: view.node_attrs,
            edges,
        })
    }

    /// Run this node's agents for one generation.
    ///
    /// Plain nodes perceive and step every occupant; a failing agent is
    /// logged and skipped, not fatal to the node. Queue nodes predict
    /// itineraries for new arrivals, replay the entries due at `time`,
    /// then drop the consumed bucket.
    async fn agents_ready(
        &self,
        client: &GraphClient,
        model: &dyn Model,
        time: u64,
    ) -> Result<(), CoreError> {
        if self.uses_queue() {
            return self.replay_queue(client, time).await;
        }

        let marker = i64::try_from(time).unwrap_or(i64::MAX);
        let occupants = client.get_node_agents(&self.entity()).await?;
        for reference in occupants {
            let Some(id) = reference.id.as_num() else {
                continue;
            };
            let stepped = client
                .get_agent_value(&reference, STEPPED_ATTR)
                .await?
                .as_ref()
                .and_then(AttrValue::as_i64);
            if stepped == Some(marker) {
                continue;
            }
            let view = self.agent_perception(client, &reference).await?;
            if view.edges.is_empty() {
                debug!(node = self.name(), agent = id, "empty view, agent skipped");
                continue;
            }
            let mut agent = model.agent(id);
            match agent.step(client, view).await {
                Ok(outcome) => {
                    client
                        .update_agent(&reference, STEPPED_ATTR, AttrValue::Int(marker))
                        .await?;
                    if let MoveOutcome::Moved(destination) = outcome {
                        provide_services(client, model, &destination, &reference).await;
                    }
                }
                Err(error) => {
                    warn!(
                        node = self.name(),
                        agent = id,
                        %error,
                        "agent step failed, skipped this generation"
                    );
                }
            }
        }
        Ok(())
    }

    /// Queue-node generation: predict new arrivals, replay due entries,
    /// drop the consumed bucket.
    async fn replay_queue(&self, client: &GraphClient, time: u64) -> Result<(), CoreError> {
        let mut queue = read_queue(client, &self.entity()).await?;
        let queued = queue.queued_agent_ids();

        let occupants = client.get_node_agents(&self.entity()).await?;
        for reference in &occupants {
            let Some(id) = reference.id.as_num() else {
                continue;
            };
            if queued.contains(&id) {
                continue;
            }
            for (tick, choice) in self.predict(client, reference, time).await? {
                queue.insert(tick, id, choice);
            }
        }

        if let Some(due) = queue.entries_at(time) {
            for (id, choice) in due.clone() {
                let agent = EntityRef::agent(id);
                let destination = EntityRef::node(&choice.destination);
                match client.relocate_agent(&agent, &destination).await {
                    Ok(()) => {}
                    // Agents deleted while queued forfeit their entry;
                    // the rest of the bucket still departs.
                    Err(StoreError::MissingEntity { .. }) => {
                        debug!(
                            node = self.name(),
                            agent = id,
                            "queued agent no longer exists, entry dropped"
                        );
                        continue;
                    }
                    Err(other) => return Err(other.into()),
                }
                // Arriving agents act from the next generation on.
                client
                    .update_agent(
                        &agent,
                        STEPPED_ATTR,
                        AttrValue::Int(i64::try_from(time).unwrap_or(i64::MAX)),
                    )
                    .await?;
                debug!(
                    node = self.name(),
                    agent = id,
                    destination = %destination,
                    wait = choice.wait_time,
                    "queued departure replayed"
                );
            }
        }
        queue.remove_tick(time);
        write_queue(client, &self.entity(), &queue).await
    }
}

/// Apply every service the destination offers to an arriving agent.
/// A failing service is logged and skipped; the move itself stands.
async fn provide_services(
    client: &GraphClient,
    model: &dyn Model,
    destination: &EntityRef,
    agent: &EntityRef,
) {
    for service in model.services_at(destination) {
        if let Err(error) = service.provide(client, agent).await {
            warn!(
                service = service.name(),
                node = %destination,
                agent = %agent,
                %error,
                "service failed, agent unserved"
            );
        }
    }
}

/// Read a node's queue attribute, defaulting to empty.
///
/// # Errors
///
/// Fails if the node is absent or the stored payload is malformed.
pub async fn read_queue(client: &GraphClient, node: &EntityRef) -> Result<NodeQueue, CoreError> {
    let raw = client.get_node_value(node, QUEUE_ATTR).await?;
    match raw.as_ref().and_then(AttrValue::as_str) {
        Some(payload) => Ok(serde_json::from_str(payload)?),
        None => Ok(NodeQueue::new()),
    }
}

/// Write a node's queue attribute back.
///
/// # Errors
///
/// Fails if the node is absent or the queue cannot be serialized.
pub async fn write_queue(
    client: &GraphClient,
    node: &EntityRef,
    queue: &NodeQueue,
) -> Result<(), CoreError> {
    let payload = serde_json::to_string(queue)?;
    client
        .update_node(node, QUEUE_ATTR, AttrValue::Text(payload))
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreachable)]
mod tests {
    use std::sync::Arc;

    use starling_store::MemoryBackend;
    use starling_types::{AttrMap, EdgeKind};

    use super::*;

    struct PlainNode;

    #[async_trait]
    impl SimNode for PlainNode {
        fn name(&self) -> &str {
            "home"
        }
    }

    /// Holds every arrival for two ticks, then sends it to "ward".
    struct HoldingNode;

    #[async_trait]
    impl SimNode for HoldingNode {
        fn name(&self) -> &str {
            "home"
        }

        fn uses_queue(&self) -> bool {
            true
        }

        fn duration(&self) -> u64 {
            2
        }

        async fn predict(
            &self,
            _client: &GraphClient,
            _agent: &EntityRef,
            time: u64,
        ) -> Result<Vec<(u64, QueuedChoice)>, CoreError> {
            Ok(vec![(
                time.saturating_add(self.duration()),
                QueuedChoice {
                    destination: "ward".to_owned(),
                    wait_time: self.duration(),
                },
            )])
        }
    }

    async fn world() -> GraphClient {
        let client = GraphClient::with_defaults(Arc::new(MemoryBackend::new()));
        for name in ["home", "ward"] {
            client
                .create_entity(&EntityRef::node(name), AttrMap::new())
                .await
                .unwrap();
        }
        let mut attrs = AttrMap::new();
        attrs.insert("cost".to_owned(), AttrValue::Float(2.0));
        client
            .create_edge(
                &EntityRef::node("home"),
                &EntityRef::node("ward"),
                EdgeKind::Reaches,
                attrs,
            )
            .await
            .unwrap();
        client
    }

    #[tokio::test]
    async fn perception_filters_unaffordable_edges() {
        let client = world().await;
        let agent = client
            .add_agent(&EntityRef::node("home"), AttrMap::new())
            .await
            .unwrap();
        client
            .update_agent(&agent, "resources", AttrValue::Float(1.0))
            .await
            .unwrap();

        let view = PlainNode.agent_perception(&client, &agent).await.unwrap();
        assert!(view.edges.is_empty());

        client
            .update_agent(&agent, "resources", AttrValue::Float(3.0))
            .await
            .unwrap();
        let view = PlainNode.agent_perception(&client, &agent).await.unwrap();
        assert_eq!(view.edges.len(), 1);
    }

    #[tokio::test]
    async fn perception_filters_full_destinations() {
        let client = world().await;
        client
            .update_node(&EntityRef::node("ward"), "capacity", AttrValue::Int(1))
            .await
            .unwrap();
        client
            .add_agent(&EntityRef::node("ward"), AttrMap::new())
            .await
            .unwrap();
        let agent = client
            .add_agent(&EntityRef::node("home"), AttrMap::new())
            .await
            .unwrap();

        let view = PlainNode.agent_perception(&client, &agent).await.unwrap();
        assert!(view.edges.is_empty());
    }

    #[tokio::test]
    async fn queue_replay_moves_agents_when_due_and_drops_the_bucket() {
        let client = world().await;
        let node = HoldingNode;
        let agent = client
            .add_agent(&EntityRef::node("home"), AttrMap::new())
            .await
            .unwrap();

        // Tick 0: arrival is predicted and committed for tick 2.
        node.agents_ready(&client, &NoAgents, 0).await.unwrap();
        let queue = read_queue(&client, &node.entity()).await.unwrap();
        assert_eq!(queue.queued_agent_ids(), vec![agent.id.as_num().unwrap()]);
        assert_eq!(
            client.locate_agent(&agent).await.unwrap(),
            EntityRef::node("home")
        );

        // Tick 1: nothing due, agent stays queued (predict not re-run).
        node.agents_ready(&client, &NoAgents, 1).await.unwrap();
        assert_eq!(
            client.locate_agent(&agent).await.unwrap(),
            EntityRef::node("home")
        );

        // Tick 2: the committed departure replays and the bucket drops.
        node.agents_ready(&client, &NoAgents, 2).await.unwrap();
        assert_eq!(
            client.locate_agent(&agent).await.unwrap(),
            EntityRef::node("ward")
        );
        let queue = read_queue(&client, &node.entity()).await.unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn queue_replay_survives_a_deleted_agent() {
        let client = world().await;
        let node = HoldingNode;
        let doomed = client
            .add_agent(&EntityRef::node("home"), AttrMap::new())
            .await
            .unwrap();
        let survivor = client
            .add_agent(&EntityRef::node("home"), AttrMap::new())
            .await
            .unwrap();

        // Tick 0: both arrivals are committed for tick 2.
        node.agents_ready(&client, &NoAgents, 0).await.unwrap();
        let queue = read_queue(&client, &node.entity()).await.unwrap();
        assert_eq!(queue.queued_agent_ids().len(), 2);

        client.delete_agent(&doomed).await.unwrap();

        // Tick 2: the deleted agent's entry is dropped, the survivor
        // still departs, and the bucket is consumed.
        node.agents_ready(&client, &NoAgents, 2).await.unwrap();
        assert_eq!(
            client.locate_agent(&survivor).await.unwrap(),
            EntityRef::node("ward")
        );
        let queue = read_queue(&client, &node.entity()).await.unwrap();
        assert!(queue.is_empty());
    }

    /// A model stub for queue tests; queue nodes never construct agents.
    struct NoAgents;

    impl Model for NoAgents {
        fn name(&self) -> &str {
            "no-agents"
        }

        fn nodes(&self) -> Vec<Box<dyn SimNode>> {
            Vec::new()
        }

        fn agent(&self, id: i64) -> Box<dyn crate::agent::MobileAgent> {
            unreachable!("queue replay never constructs agents, got id {id}")
        }
    }
}
