//! The clustering intervenor.
//!
//! Tracks communities in the social graph incrementally. `initialise`
//! runs one unseeded detection to lay down the cluster entities, the
//! membership edges, and each agent's `seedCluster` stamp; every later
//! cycle reruns detection seeded by those stamps and records only the
//! memberships not already in the store. Membership strength starts at
//! zero and is the model's to raise.

use starling_store::{GraphClient, StoreError};
use starling_types::{AttrMap, AttrValue, EntityId, EntityRef};
use tracing::{debug, info};

use async_trait::async_trait;
use starling_core::{CoreError, Intervenor};

/// Agent attribute seeding the next detection run.
pub const SEED_ATTR: &str = "seedCluster";

/// Default membership-strength attribute on grouping edges.
pub const STRENGTH_ATTR: &str = "strength";

/// Incremental seeded clustering over the social graph.
#[derive(Debug, Default)]
pub struct ClusterIntervenor {
    /// Memberships found by the last `check` and not yet recorded.
    pending: Vec<(EntityRef, i64)>,
}

impl ClusterIntervenor {
    /// Create an intervenor with no pending change set.
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// First-run initialisation: unseeded detection, then create every
    /// cluster entity, every membership edge, and each agent's seed
    /// stamp.
    ///
    /// # Errors
    ///
    /// Fails if the store is unreachable or detection is unsupported.
    pub async fn initialise(&self, client: &GraphClient) -> Result<(), CoreError> {
        let assignments = client.louvain(None).await?;
        info!(agents = assignments.len(), "initial community detection");
        for assignment in &assignments {
            for community in assignment.all_communities() {
                let cluster = EntityRef::cluster(community);
                ensure_cluster(client, &cluster).await?;
                ensure_grouping(client, &cluster, &assignment.entity).await?;
            }
            client
                .update_agent(
                    &assignment.entity,
                    SEED_ATTR,
                    AttrValue::Int(assignment.final_community),
                )
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Intervenor for ClusterIntervenor {
    fn name(&self) -> &str {
        "cluster"
    }

    /// Seeded detection; the change set is every reported membership
    /// not already recorded as a grouping edge. Recomputed from scratch
    /// each cycle.
    async fn check(&mut self, client: &GraphClient) -> Result<bool, CoreError> {
        self.pending.clear();
        let assignments = client.louvain(Some(SEED_ATTR)).await?;
        for assignment in &assignments {
            let recorded = match client.check_groupings(&assignment.entity).await {
                Ok(clusters) => clusters,
                // Agents deleted since detection ran are skipped.
                Err(StoreError::MissingEntity { .. }) => continue,
                Err(other) => return Err(other.into()),
            };
            let recorded_ids: Vec<i64> = recorded
                .iter()
                .filter_map(|c| c.id.as_num())
                .collect();
            for community in assignment.all_communities() {
                if !recorded_ids.contains(&community) {
                    self.pending.push((assignment.entity.clone(), community));
                }
            }
        }
        debug!(new_groupings = self.pending.len(), "clustering check");
        Ok(!self.pending.is_empty())
    }

    /// Record the pending memberships: create absent cluster entities,
    /// then the grouping edges with zero starting strength.
    async fn apply_change(&mut self, client: &GraphClient) -> Result<(), CoreError> {
        let known = client.clusters_in_system().await?;
        let known_ids: Vec<i64> = known.iter().filter_map(|c| c.id.as_num()).collect();
        for (agent, community) in self.pending.drain(..) {
            let cluster = EntityRef::cluster(community);
            if !known_ids.contains(&community) && !client.entity_exists(&cluster).await? {
                client.create_entity(&cluster, AttrMap::new()).await?;
            }
            ensure_grouping(client, &cluster, &agent).await?;
            info!(agent = %agent, cluster = community, "new grouping recorded");
        }
        Ok(())
    }
}

async fn ensure_cluster(client: &GraphClient, cluster: &EntityRef) -> Result<(), CoreError> {
    if !client.entity_exists(cluster).await? {
        client.create_entity(cluster, AttrMap::new()).await?;
    }
    Ok(())
}

async fn ensure_grouping(
    client: &GraphClient,
    cluster: &EntityRef,
    agent: &EntityRef,
) -> Result<(), CoreError> {
    if !client
        .check_groupings(agent)
        .await?
        .iter()
        .any(|c| c == cluster)
    {
        let mut attrs = AttrMap::new();
        attrs.insert(STRENGTH_ATTR.to_owned(), AttrValue::Float(0.0));
        client
            .create_edge(cluster, agent, starling_types::EdgeKind::Grouped, attrs)
            .await?;
    }
    Ok(())
}

/// Raise or lower one membership's strength.
///
/// # Errors
///
/// Fails if the grouping edge does not exist.
pub async fn update_cluster_strength(
    client: &GraphClient,
    agent: &EntityRef,
    cluster: &EntityRef,
    strength: f64,
) -> Result<(), CoreError> {
    client
        .update_edge(
            cluster,
            agent,
            starling_types::EdgeKind::Grouped,
            STRENGTH_ATTR,
            AttrValue::Float(strength),
        )
        .await?;
    Ok(())
}

/// Fallback seed for an agent left with no memberships: its own id.
pub(crate) fn own_seed(agent: &EntityRef) -> i64 {
    match &agent.id {
        EntityId::Num(n) => *n,
        EntityId::Text(_) => 0,
    }
}
