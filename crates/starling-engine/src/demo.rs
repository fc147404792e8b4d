//! The built-in demonstration model.
//!
//! Two fully connected zero-cost nodes, agents that hop between them
//! every generation, and a population intervenor that tops the
//! population back up to the tagged size. Small enough to read in one
//! sitting, complete enough to exercise every subsystem; the
//! integration suite runs it end to end.

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use starling_core::{
    ClockBarrier, CoreError, Intervenor, MobileAgent, Model, Service, SimNode,
};
use starling_store::GraphClient;
use starling_types::{AttrMap, AttrValue, EdgeKind, EdgeView, EntityRef, Perception};

/// Node names of the demo world.
const NODES: [&str; 2] = ["left", "right"];

/// A plain node with no capacity limit and no queue.
struct DemoNode {
    name: &'static str,
}

#[async_trait]
impl SimNode for DemoNode {
    fn name(&self) -> &str {
        self.name
    }
}

/// Hops to a uniformly chosen neighbour every generation.
struct DemoAgent {
    id: i64,
}

#[async_trait]
impl MobileAgent for DemoAgent {
    fn id(&self) -> i64 {
        self.id
    }

    fn params(&self) -> Vec<String> {
        vec!["moves".to_owned()]
    }

    async fn generate(&mut self, client: &GraphClient) -> Result<(), CoreError> {
        client
            .update_agent(&self.entity(), "moves", AttrValue::Int(0))
            .await?;
        Ok(())
    }

    async fn perceive(
        &mut self,
        _client: &GraphClient,
        view: Perception,
    ) -> Result<Vec<EdgeView>, CoreError> {
        Ok(view.edges)
    }

    async fn choose(
        &mut self,
        _client: &GraphClient,
        options: &[EdgeView],
    ) -> Result<Option<EdgeView>, CoreError> {
        Ok(options.choose(&mut rand::rng()).cloned())
    }

    async fn pay(&mut self, _client: &GraphClient, _choice: &EdgeView) -> Result<bool, CoreError> {
        // Every edge is free in the demo world.
        Ok(true)
    }

    async fn learn(&mut self, client: &GraphClient, _choice: &EdgeView) -> Result<(), CoreError> {
        let moves = client
            .get_agent_value(&self.entity(), "moves")
            .await?
            .as_ref()
            .and_then(AttrValue::as_i64)
            .unwrap_or(0);
        client
            .update_agent(
                &self.entity(),
                "moves",
                AttrValue::Int(moves.saturating_add(1)),
            )
            .await?;
        Ok(())
    }
}

/// Offered at the right-hand node: stamps a `visits` counter on every
/// arriving agent.
struct Reception;

#[async_trait]
impl Service for Reception {
    fn name(&self) -> &str {
        "reception"
    }

    fn service_type(&self) -> &str {
        "record"
    }

    async fn provide(&self, client: &GraphClient, user: &EntityRef) -> Result<(), CoreError> {
        let visits = client
            .get_agent_value(user, "visits")
            .await?
            .as_ref()
            .and_then(AttrValue::as_i64)
            .unwrap_or(0);
        client
            .update_agent(user, "visits", AttrValue::Int(visits.saturating_add(1)))
            .await?;
        Ok(())
    }
}

/// Tops the population back up to the size recorded in the run tag.
#[derive(Default)]
struct DemoPopulation {
    deficit: u64,
}

#[async_trait]
impl Intervenor for DemoPopulation {
    fn name(&self) -> &str {
        "population"
    }

    async fn check(&mut self, client: &GraphClient) -> Result<bool, CoreError> {
        let target = client.get_pop_size().await?;
        let current = u64::try_from(client.agents_in_system().await?.len()).unwrap_or(u64::MAX);
        self.deficit = target.saturating_sub(current);
        Ok(self.deficit > 0)
    }

    async fn apply_change(&mut self, client: &GraphClient) -> Result<(), CoreError> {
        let home = EntityRef::node(NODES[0]);
        for _ in 0..self.deficit {
            let reference = client.add_agent(&home, AttrMap::new()).await?;
            if let Some(id) = reference.id.as_num() {
                DemoAgent { id }.generate(client).await?;
            }
        }
        self.deficit = 0;
        Ok(())
    }
}

/// The demo model.
#[derive(Debug, Default)]
pub struct DemoModel;

#[async_trait]
impl Model for DemoModel {
    fn name(&self) -> &str {
        "demo"
    }

    fn nodes(&self) -> Vec<Box<dyn SimNode>> {
        NODES
            .iter()
            .map(|name| Box::new(DemoNode { name }) as Box<dyn SimNode>)
            .collect()
    }

    fn agent(&self, id: i64) -> Box<dyn MobileAgent> {
        Box::new(DemoAgent { id })
    }

    fn services_at(&self, node: &EntityRef) -> Vec<Box<dyn Service>> {
        if node.id.as_text() == Some(NODES[1]) {
            vec![Box::new(Reception)]
        } else {
            Vec::new()
        }
    }

    fn intervenor(&self, role: &str) -> Option<Box<dyn Intervenor>> {
        (role == "population").then(|| Box::new(DemoPopulation::default()) as Box<dyn Intervenor>)
    }

    async fn set_edges(&self, client: &GraphClient) -> Result<(), CoreError> {
        let mut attrs = AttrMap::new();
        attrs.insert("cost".to_owned(), AttrValue::Float(0.0));
        for (a, b) in [(NODES[0], NODES[1]), (NODES[1], NODES[0])] {
            client
                .create_edge(
                    &EntityRef::node(a),
                    &EntityRef::node(b),
                    EdgeKind::Reaches,
                    attrs.clone(),
                )
                .await?;
        }
        Ok(())
    }

    async fn generate_population(&self, client: &GraphClient, size: u64) -> Result<(), CoreError> {
        let home = EntityRef::node(NODES[0]);
        for _ in 0..size {
            let reference = client.add_agent(&home, AttrMap::new()).await?;
            if let Some(id) = reference.id.as_num() {
                DemoAgent { id }.generate(client).await?;
            }
        }
        Ok(())
    }
}

/// Convenience driver used by local runs and the test suite: reset is
/// assumed done; runs the flow loop to completion.
///
/// # Errors
///
/// Fails if the clock can no longer be read or advanced.
pub async fn drive_demo(
    client: &GraphClient,
    barrier: &ClockBarrier,
    run_length: u64,
) -> Result<(), crate::error::EngineError> {
    crate::flow::run_flow(client, barrier, &DemoModel, run_length).await
}
