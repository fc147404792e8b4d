//! Membership orientation maintenance.
//!
//! Strength-based pruning of grouping edges. The ordering says which
//! direction is "stronger": ascending keeps high strengths and drops
//! memberships below the threshold, descending keeps low strengths and
//! drops memberships above it. After pruning, each touched agent's
//! `seedCluster` stamp is repointed at its surviving membership with
//! the extreme strength for the ordering, so the stamp never references
//! a dropped cluster. An agent stripped of every membership falls back
//! to seeding with its own id.

use starling_core::CoreError;
use starling_store::GraphClient;
use starling_types::{AttrValue, EdgeKind, EntityRef};
use tracing::{debug, info};

use crate::intervenor::{SEED_ATTR, own_seed};

/// Which direction of a strength attribute counts as stronger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthOrdering {
    /// Higher values are stronger; drop memberships below the
    /// threshold.
    Ascending,
    /// Lower values are stronger; drop memberships above the threshold.
    Descending,
}

impl StrengthOrdering {
    const fn drops(self, strength: f64, threshold: f64) -> bool {
        match self {
            Self::Ascending => strength < threshold,
            Self::Descending => strength > threshold,
        }
    }

    fn stronger(self, a: f64, b: f64) -> bool {
        match self {
            Self::Ascending => a > b,
            Self::Descending => a < b,
        }
    }
}

/// Prune weak memberships and repoint the seed stamps.
///
/// # Errors
///
/// Fails if the store is unreachable beyond the retry budget.
pub async fn update_cluster_orientation(
    client: &GraphClient,
    attribute: &str,
    threshold: f64,
    ordering: StrengthOrdering,
) -> Result<(), CoreError> {
    let mut touched: Vec<EntityRef> = Vec::new();

    for cluster in client.clusters_in_system().await? {
        for agent in client.agents_in_cluster(&cluster).await? {
            let strength = client
                .get_edge_value(&cluster, &agent, EdgeKind::Grouped, attribute)
                .await?
                .as_ref()
                .and_then(AttrValue::as_f64)
                .unwrap_or(0.0);
            if ordering.drops(strength, threshold) {
                client
                    .delete_edge(&cluster, &agent, EdgeKind::Grouped)
                    .await?;
                debug!(agent = %agent, cluster = %cluster, strength, "membership dropped");
                if !touched.contains(&agent) {
                    touched.push(agent);
                }
            }
        }
    }

    for agent in touched {
        repoint_seed(client, &agent, attribute, ordering).await?;
    }
    Ok(())
}

/// Point the agent's seed stamp at its surviving membership with the
/// extreme strength for the ordering.
async fn repoint_seed(
    client: &GraphClient,
    agent: &EntityRef,
    attribute: &str,
    ordering: StrengthOrdering,
) -> Result<(), CoreError> {
    let mut best: Option<(i64, f64)> = None;
    for cluster in client.check_groupings(agent).await? {
        let Some(id) = cluster.id.as_num() else {
            continue;
        };
        let strength = client
            .get_edge_value(&cluster, agent, EdgeKind::Grouped, attribute)
            .await?
            .as_ref()
            .and_then(AttrValue::as_f64)
            .unwrap_or(0.0);
        let replace = best.is_none_or(|(_, held)| ordering.stronger(strength, held));
        if replace {
            best = Some((id, strength));
        }
    }

    let seed = best.map_or_else(|| own_seed(agent), |(id, _)| id);
    client
        .update_agent(agent, SEED_ATTR, AttrValue::Int(seed))
        .await?;
    info!(agent = %agent, seed, "seed stamp repointed");
    Ok(())
}
