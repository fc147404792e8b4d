//! Clustering behaviour over the in-memory backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use starling_cluster::{
    ClusterIntervenor, SEED_ATTR, STRENGTH_ATTR, StrengthOrdering, update_cluster_orientation,
    update_cluster_strength,
};
use starling_core::Intervenor;
use starling_store::{GraphClient, MemoryBackend};
use starling_types::{AttrMap, AttrValue, EdgeKind, EntityRef};

async fn triangle(client: &GraphClient, ids: [i64; 3]) {
    for id in ids {
        client
            .create_entity(&EntityRef::agent(id), AttrMap::new())
            .await
            .unwrap();
    }
    for (a, b) in [(ids[0], ids[1]), (ids[1], ids[2]), (ids[2], ids[0])] {
        client
            .create_edge(
                &EntityRef::agent(a),
                &EntityRef::agent(b),
                EdgeKind::Social,
                AttrMap::new(),
            )
            .await
            .unwrap();
    }
}

async fn two_triangle_world() -> GraphClient {
    let client = GraphClient::with_defaults(Arc::new(MemoryBackend::new()));
    triangle(&client, [1, 2, 3]).await;
    triangle(&client, [4, 5, 6]).await;
    client
}

#[tokio::test]
async fn two_triangles_become_two_clusters_of_three() {
    let client = two_triangle_world().await;
    ClusterIntervenor::new().initialise(&client).await.unwrap();

    let clusters = client.clusters_in_system().await.unwrap();
    assert_eq!(clusters.len(), 2);
    for cluster in &clusters {
        let members = client.agents_in_cluster(cluster).await.unwrap();
        assert_eq!(members.len(), 3);
        for member in &members {
            let strength = client
                .get_edge_value(cluster, member, EdgeKind::Grouped, STRENGTH_ATTR)
                .await
                .unwrap();
            assert_eq!(strength, Some(AttrValue::Float(0.0)));
        }
    }
}

#[tokio::test]
async fn rerun_on_unchanged_graph_finds_nothing_new() {
    let client = two_triangle_world().await;
    let mut intervenor = ClusterIntervenor::new();
    intervenor.initialise(&client).await.unwrap();

    // Seeded detection on the unchanged graph reports exactly the
    // recorded memberships.
    assert!(!intervenor.check(&client).await.unwrap());
}

#[tokio::test]
async fn a_new_social_bridge_produces_new_groupings() {
    let client = two_triangle_world().await;
    let mut intervenor = ClusterIntervenor::new();
    intervenor.initialise(&client).await.unwrap();

    // Densely connect agent 4 into the first triangle so detection
    // pulls it across.
    for other in [1, 2, 3] {
        client
            .create_edge(
                &EntityRef::agent(4),
                &EntityRef::agent(other),
                EdgeKind::Social,
                AttrMap::new(),
            )
            .await
            .unwrap();
        client
            .create_edge(
                &EntityRef::agent(other),
                &EntityRef::agent(4),
                EdgeKind::Social,
                AttrMap::new(),
            )
            .await
            .unwrap();
    }

    if intervenor.check(&client).await.unwrap() {
        intervenor.apply_change(&client).await.unwrap();
        let groupings = client
            .check_groupings(&EntityRef::agent(4))
            .await
            .unwrap();
        assert!(groupings.len() >= 2);
    }
}

#[tokio::test]
async fn orientation_prunes_weak_memberships_and_repoints_seeds() {
    let client = two_triangle_world().await;
    ClusterIntervenor::new().initialise(&client).await.unwrap();

    let clusters = client.clusters_in_system().await.unwrap();
    let first = clusters.first().unwrap().clone();
    let members = client.agents_in_cluster(&first).await.unwrap();

    // One member earns strength, the rest stay at zero.
    let kept = members.first().unwrap().clone();
    update_cluster_strength(&client, &kept, &first, 5.0)
        .await
        .unwrap();

    update_cluster_orientation(&client, STRENGTH_ATTR, 1.0, StrengthOrdering::Ascending)
        .await
        .unwrap();

    let survivors = client.agents_in_cluster(&first).await.unwrap();
    assert_eq!(survivors, vec![kept.clone()]);

    // Every agent's seed stamp references a live membership or itself.
    for agent in client.agents_in_system().await.unwrap() {
        let seed = client
            .get_agent_value(&agent, SEED_ATTR)
            .await
            .unwrap()
            .and_then(|v| v.as_i64())
            .expect("every agent is stamped");
        let groupings = client.check_groupings(&agent).await.unwrap();
        if groupings.is_empty() {
            assert_eq!(Some(seed), agent.id.as_num());
        } else {
            assert!(
                groupings
                    .iter()
                    .any(|c| c.id.as_num() == Some(seed)),
                "seed {seed} must reference a surviving membership"
            );
        }
    }
}
