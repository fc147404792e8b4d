//! Agent movement and social contracts.
//!
//! A mobile agent steps through a fixed pipeline each generation:
//! perceive the node's pre-filtered view, choose one edge, pay for it,
//! relocate, learn. Perception always precedes choice; a refused
//! payment cancels the whole move with no store changes, and the move
//! itself is one atomic location-edge replacement.

use async_trait::async_trait;
use starling_store::GraphClient;
use starling_types::{EdgeView, EntityRef, Perception};
use tracing::debug;

use crate::error::CoreError;

/// What a single agent step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The agent paid and relocated to this node.
    Moved(EntityRef),
    /// The agent chose an edge but declined to pay; nothing changed.
    PaymentRefused,
    /// No edge survived perception and choice; nothing changed.
    NoViableEdge,
}

/// A model-defined moving agent.
///
/// `perceive`, `choose`, `pay` and `learn` are the model's decision
/// hooks; `step` is the provided pipeline that sequences them.
#[async_trait]
pub trait MobileAgent: Send {
    /// The agent's numeric id.
    fn id(&self) -> i64;

    /// Names of the agent attributes monitors sample for this model.
    fn params(&self) -> Vec<String> {
        Vec::new()
    }

    /// The agent's store reference.
    fn entity(&self) -> EntityRef {
        EntityRef::agent(self.id())
    }

    /// Seed the agent's starting attributes. Called once at creation.
    async fn generate(&mut self, client: &GraphClient) -> Result<(), CoreError>;

    /// Narrow the node's pre-filtered view to the edges this agent will
    /// consider.
    async fn perceive(
        &mut self,
        client: &GraphClient,
        view: Perception,
    ) -> Result<Vec<EdgeView>, CoreError>;

    /// Pick one of the perceived edges, or none.
    async fn choose(
        &mut self,
        client: &GraphClient,
        options: &[EdgeView],
    ) -> Result<Option<EdgeView>, CoreError>;

    /// Spend whatever the chosen edge costs. Returning `false` cancels
    /// the move: no location change, no learning, and any queue state
    /// is retained for the next generation.
    async fn pay(&mut self, client: &GraphClient, choice: &EdgeView) -> Result<bool, CoreError>;

    /// Post-move update; may consult the destination node's services.
    async fn learn(&mut self, client: &GraphClient, choice: &EdgeView) -> Result<(), CoreError>;

    /// The full per-generation pipeline.
    async fn step(
        &mut self,
        client: &GraphClient,
        view: Perception,
    ) -> Result<MoveOutcome, CoreError> {
        let options = self.perceive(client, view).await?;
        let Some(choice) = self.choose(client, &options).await? else {
            return Ok(MoveOutcome::NoViableEdge);
        };
        if !self.pay(client, &choice).await? {
            debug!(agent = self.id(), "payment refused, move cancelled");
            return Ok(MoveOutcome::PaymentRefused);
        }
        client
            .relocate_agent(&self.entity(), &choice.destination)
            .await?;
        self.learn(client, &choice).await?;
        Ok(MoveOutcome::Moved(choice.destination))
    }
}

/// A model-defined socialising agent.
///
/// Runs once per generation in the social subsystem. The provided
/// `socialise` pipeline sequences the hooks: survey the agent's social
/// edges, update them, pick a partner to talk to, listen to that
/// partner, then react.
#[async_trait]
pub trait CommunicativeAgent: Send {
    /// The agent's numeric id.
    fn id(&self) -> i64;

    /// The agent's store reference.
    fn entity(&self) -> EntityRef {
        EntityRef::agent(self.id())
    }

    /// Survey current contacts; typically `client.agent_relationships`
    /// plus model filtering.
    async fn survey(
        &mut self,
        client: &GraphClient,
    ) -> Result<Vec<EntityRef>, CoreError>;

    /// Maintain the surveyed edges (decay, pruning).
    async fn update(
        &mut self,
        client: &GraphClient,
        contacts: &[EntityRef],
    ) -> Result<(), CoreError>;

    /// Pick a partner to address this generation, or none.
    async fn talk(
        &mut self,
        client: &GraphClient,
        contacts: &[EntityRef],
    ) -> Result<Option<EntityRef>, CoreError>;

    /// Take in the addressed partner's state.
    async fn listen(
        &mut self,
        client: &GraphClient,
        partner: &EntityRef,
    ) -> Result<(), CoreError>;

    /// Adjust own state after the exchange.
    async fn react(&mut self, client: &GraphClient) -> Result<(), CoreError>;

    /// The full per-generation social pipeline.
    async fn socialise(&mut self, client: &GraphClient) -> Result<(), CoreError> {
        let contacts = self.survey(client).await?;
        self.update(client, &contacts).await?;
        if let Some(partner) = self.talk(client, &contacts).await? {
            self.listen(client, &partner).await?;
        }
        self.react(client).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use starling_store::MemoryBackend;
    use starling_types::{AttrMap, AttrValue, EdgeKind};

    use super::*;

    /// Walks to the cheapest edge it can afford.
    struct Walker {
        id: i64,
        budget: f64,
    }

    #[async_trait]
    impl MobileAgent for Walker {
        fn id(&self) -> i64 {
            self.id
        }

        async fn generate(&mut self, _client: &GraphClient) -> Result<(), CoreError> {
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
            Ok(options
                .iter()
                .min_by(|a, b| a.edge_cost().total_cmp(&b.edge_cost()))
                .cloned())
        }

        async fn pay(
            &mut self,
            _client: &GraphClient,
            choice: &EdgeView,
        ) -> Result<bool, CoreError> {
            if choice.edge_cost() > self.budget {
                return Ok(false);
            }
            self.budget -= choice.edge_cost();
            Ok(true)
        }

        async fn learn(
            &mut self,
            client: &GraphClient,
            _choice: &EdgeView,
        ) -> Result<(), CoreError> {
            client
                .update_agent(&self.entity(), "moves", AttrValue::Int(1))
                .await?;
            Ok(())
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
        attrs.insert("cost".to_owned(), AttrValue::Float(3.0));
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

    /// Records which social hooks ran, in order.
    struct Gossip {
        id: i64,
        partner: Option<EntityRef>,
        calls: Vec<&'static str>,
    }

    #[async_trait]
    impl CommunicativeAgent for Gossip {
        fn id(&self) -> i64 {
            self.id
        }

        async fn survey(&mut self, _client: &GraphClient) -> Result<Vec<EntityRef>, CoreError> {
            self.calls.push("survey");
            Ok(self.partner.iter().cloned().collect())
        }

        async fn update(
            &mut self,
            _client: &GraphClient,
            _contacts: &[EntityRef],
        ) -> Result<(), CoreError> {
            self.calls.push("update");
            Ok(())
        }

        async fn talk(
            &mut self,
            _client: &GraphClient,
            contacts: &[EntityRef],
        ) -> Result<Option<EntityRef>, CoreError> {
            self.calls.push("talk");
            Ok(contacts.first().cloned())
        }

        async fn listen(
            &mut self,
            _client: &GraphClient,
            _partner: &EntityRef,
        ) -> Result<(), CoreError> {
            self.calls.push("listen");
            Ok(())
        }

        async fn react(&mut self, _client: &GraphClient) -> Result<(), CoreError> {
            self.calls.push("react");
            Ok(())
        }
    }

    #[tokio::test]
    async fn socialise_runs_the_hooks_in_order() {
        let client = world().await;
        let mut agent = Gossip {
            id: 1,
            partner: Some(EntityRef::agent(2)),
            calls: Vec::new(),
        };

        agent.socialise(&client).await.unwrap();
        assert_eq!(agent.calls, ["survey", "update", "talk", "listen", "react"]);
    }

    #[tokio::test]
    async fn socialise_skips_listen_without_a_partner() {
        let client = world().await;
        let mut agent = Gossip {
            id: 1,
            partner: None,
            calls: Vec::new(),
        };

        agent.socialise(&client).await.unwrap();
        assert_eq!(agent.calls, ["survey", "update", "talk", "react"]);
    }

    #[tokio::test]
    async fn a_funded_step_moves_and_learns() {
        let client = world().await;
        let agent = client
            .add_agent(&EntityRef::node("home"), AttrMap::new())
            .await
            .unwrap();
        let mut walker = Walker {
            id: agent.id.as_num().unwrap(),
            budget: 5.0,
        };

        let view = client.perception(&agent).await.unwrap();
        let outcome = walker.step(&client, view).await.unwrap();

        assert_eq!(outcome, MoveOutcome::Moved(EntityRef::node("ward")));
        assert_eq!(
            client.locate_agent(&agent).await.unwrap(),
            EntityRef::node("ward")
        );
        assert_eq!(
            client.get_agent_value(&agent, "moves").await.unwrap(),
            Some(AttrValue::Int(1))
        );
    }

    #[tokio::test]
    async fn a_refused_payment_changes_nothing() {
        let client = world().await;
        let agent = client
            .add_agent(&EntityRef::node("home"), AttrMap::new())
            .await
            .unwrap();
        let mut walker = Walker {
            id: agent.id.as_num().unwrap(),
            budget: 1.0,
        };

        let view = client.perception(&agent).await.unwrap();
        let outcome = walker.step(&client, view).await.unwrap();

        assert_eq!(outcome, MoveOutcome::PaymentRefused);
        assert_eq!(
            client.locate_agent(&agent).await.unwrap(),
            EntityRef::node("home")
        );
        assert_eq!(client.get_agent_value(&agent, "moves").await.unwrap(), None);
    }

    #[tokio::test]
    async fn an_empty_view_is_no_viable_edge() {
        let client = world().await;
        let agent = client
            .add_agent(&EntityRef::node("ward"), AttrMap::new())
            .await
            .unwrap();
        let mut walker = Walker {
            id: agent.id.as_num().unwrap(),
            budget: 5.0,
        };

        // "ward" has no outgoing movement edges.
        let view = client.perception(&agent).await.unwrap();
        let outcome = walker.step(&client, view).await.unwrap();
        assert_eq!(outcome, MoveOutcome::NoViableEdge);
    }
}
