//! In-memory graph backend.
//!
//! Holds the whole graph in a petgraph [`StableDiGraph`] behind a
//! [`tokio::sync::RwLock`], with a `(kind, id_field, id)` index for
//! reference resolution. Used for local runs and the test suite: it
//! implements the delegated algorithms itself (dijkstra path cost,
//! seeded label propagation for community detection), so the full
//! protocol can run without an external store.
//!
//! All subsystem handles share one backend via [`std::sync::Arc`]; the
//! lock makes each operation atomic, which also gives
//! [`relocate_agent`] its single-operation semantics.
//!
//! [`relocate_agent`]: crate::backend::GraphBackend::relocate_agent

use std::collections::BTreeMap;

use async_trait::async_trait;
use petgraph::Direction;
use petgraph::graph::Graph;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use starling_types::{AttrMap, AttrValue, EdgeKind, EntityId, EntityRef};
use tokio::sync::RwLock;

use crate::backend::{CommunityAssignment, GraphBackend};
use crate::error::StoreError;

/// Upper bound on label-propagation sweeps.
const MAX_PROPAGATION_SWEEPS: usize = 32;

/// Entity payload stored at each graph vertex.
#[derive(Debug, Clone)]
struct EntityData {
    reference: EntityRef,
    attrs: AttrMap,
}

/// Edge payload: kind label plus attributes.
#[derive(Debug, Clone)]
struct EdgeData {
    kind: EdgeKind,
    attrs: AttrMap,
}

#[derive(Debug, Default)]
struct Inner {
    graph: StableDiGraph<EntityData, EdgeData>,
    index: BTreeMap<(String, String, EntityId), NodeIndex>,
}

fn index_key(reference: &EntityRef) -> (String, String, EntityId) {
    (
        reference.kind.clone(),
        reference.id_field.clone(),
        reference.id.clone(),
    )
}

impl Inner {
    fn resolve(&self, reference: &EntityRef) -> Result<NodeIndex, StoreError> {
        self.index
            .get(&index_key(reference))
            .copied()
            .ok_or_else(|| StoreError::MissingEntity {
                reference: reference.clone(),
            })
    }

    fn edge_between(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        kind: EdgeKind,
    ) -> Option<petgraph::stable_graph::EdgeIndex> {
        self.graph
            .edges(from)
            .find(|e| e.target() == to && e.weight().kind == kind)
            .map(|e| e.id())
    }

    /// Neighbors over one edge kind in both directions.
    fn symmetric_neighbors(&self, idx: NodeIndex, kind: EdgeKind) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .edges(idx)
            .filter(|e| e.weight().kind == kind)
            .map(|e| e.target())
            .collect();
        out.extend(
            self.graph
                .edges_directed(idx, Direction::Incoming)
                .filter(|e| e.weight().kind == kind)
                .map(|e| e.source()),
        );
        out
    }
}

/// Shared in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: RwLock<Inner>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphBackend for MemoryBackend {
    async fn get_entity(&self, reference: &EntityRef) -> Result<AttrMap, StoreError> {
        let inner = self.inner.read().await;
        let idx = inner.resolve(reference)?;
        Ok(inner
            .graph
            .node_weight(idx)
            .map(|d| d.attrs.clone())
            .unwrap_or_default())
    }

    async fn entity_exists(&self, reference: &EntityRef) -> Result<bool, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.index.contains_key(&index_key(reference)))
    }

    async fn create_entity(
        &self,
        reference: &EntityRef,
        mut attrs: AttrMap,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let key = index_key(reference);
        if inner.index.contains_key(&key) {
            return Err(StoreError::backend(format!(
                "entity already exists: {reference}"
            )));
        }
        // The id field is an ordinary attribute on the stored entity.
        let id_value = match &reference.id {
            EntityId::Num(n) => AttrValue::Int(*n),
            EntityId::Text(s) => AttrValue::Text(s.clone()),
        };
        attrs.insert(reference.id_field.clone(), id_value);
        let idx = inner.graph.add_node(EntityData {
            reference: reference.clone(),
            attrs,
        });
        inner.index.insert(key, idx);
        Ok(())
    }

    async fn delete_entity(&self, reference: &EntityRef) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let idx = inner.resolve(reference)?;
        // remove_node detaches all edges.
        inner.graph.remove_node(idx);
        inner.index.remove(&index_key(reference));
        Ok(())
    }

    async fn set_attribute(
        &self,
        reference: &EntityRef,
        name: &str,
        value: AttrValue,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let idx = inner.resolve(reference)?;
        if let Some(data) = inner.graph.node_weight_mut(idx) {
            data.attrs.insert(name.to_owned(), value);
        }
        Ok(())
    }

    async fn get_attribute(
        &self,
        reference: &EntityRef,
        name: &str,
    ) -> Result<Option<AttrValue>, StoreError> {
        let inner = self.inner.read().await;
        let idx = inner.resolve(reference)?;
        Ok(inner
            .graph
            .node_weight(idx)
            .and_then(|d| d.attrs.get(name).cloned()))
    }

    async fn max_numeric_id(&self, kind: &str) -> Result<Option<i64>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .index
            .keys()
            .filter(|(k, _, _)| k == kind)
            .filter_map(|(_, _, id)| id.as_num())
            .max())
    }

    async fn entities_of_kind(&self, kind: &str) -> Result<Vec<EntityRef>, StoreError> {
        let inner = self.inner.read().await;
        let mut refs: Vec<EntityRef> = inner
            .index
            .values()
            .filter_map(|&idx| inner.graph.node_weight(idx))
            .filter(|d| d.reference.kind == kind)
            .map(|d| d.reference.clone())
            .collect();
        refs.sort();
        Ok(refs)
    }

    async fn create_edge(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        attrs: AttrMap,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let a = inner.resolve(from)?;
        let b = inner.resolve(to)?;
        inner.graph.add_edge(a, b, EdgeData { kind, attrs });
        Ok(())
    }

    async fn delete_edge(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let a = inner.resolve(from)?;
        let b = inner.resolve(to)?;
        let mut removed = 0u64;
        while let Some(edge) = inner.edge_between(a, b, kind) {
            inner.graph.remove_edge(edge);
            removed = removed.saturating_add(1);
        }
        Ok(removed)
    }

    async fn edge_exists(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.read().await;
        let a = inner.resolve(from)?;
        let b = inner.resolve(to)?;
        Ok(inner.edge_between(a, b, kind).is_some())
    }

    async fn set_edge_attribute(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        name: &str,
        value: AttrValue,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let a = inner.resolve(from)?;
        let b = inner.resolve(to)?;
        let edge = inner
            .edge_between(a, b, kind)
            .ok_or_else(|| StoreError::MissingEdge {
                from: from.clone(),
                to: to.clone(),
                kind: kind.as_label(),
            })?;
        if let Some(data) = inner.graph.edge_weight_mut(edge) {
            data.attrs.insert(name.to_owned(), value);
        }
        Ok(())
    }

    async fn get_edge_attribute(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        name: &str,
    ) -> Result<Option<AttrValue>, StoreError> {
        let inner = self.inner.read().await;
        let a = inner.resolve(from)?;
        let b = inner.resolve(to)?;
        Ok(inner
            .edge_between(a, b, kind)
            .and_then(|edge| inner.graph.edge_weight(edge))
            .and_then(|d| d.attrs.get(name).cloned()))
    }

    async fn out_neighbors(
        &self,
        reference: &EntityRef,
        kind: EdgeKind,
    ) -> Result<Vec<(EntityRef, AttrMap)>, StoreError> {
        let inner = self.inner.read().await;
        let idx = inner.resolve(reference)?;
        Ok(inner
            .graph
            .edges(idx)
            .filter(|e| e.weight().kind == kind)
            .filter_map(|e| {
                inner
                    .graph
                    .node_weight(e.target())
                    .map(|d| (d.reference.clone(), e.weight().attrs.clone()))
            })
            .collect())
    }

    async fn in_neighbors(
        &self,
        reference: &EntityRef,
        kind: EdgeKind,
    ) -> Result<Vec<(EntityRef, AttrMap)>, StoreError> {
        let inner = self.inner.read().await;
        let idx = inner.resolve(reference)?;
        Ok(inner
            .graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| e.weight().kind == kind)
            .filter_map(|e| {
                inner
                    .graph
                    .node_weight(e.source())
                    .map(|d| (d.reference.clone(), e.weight().attrs.clone()))
            })
            .collect())
    }

    async fn relocate_agent(
        &self,
        agent: &EntityRef,
        destination: &EntityRef,
    ) -> Result<(), StoreError> {
        // One write-lock critical section: the agent is never observable
        // with zero or two location edges.
        let mut inner = self.inner.write().await;
        let a = inner.resolve(agent)?;
        let d = inner.resolve(destination)?;
        let old: Vec<_> = inner
            .graph
            .edges(a)
            .filter(|e| e.weight().kind == EdgeKind::Located)
            .map(|e| e.id())
            .collect();
        for edge in old {
            inner.graph.remove_edge(edge);
        }
        inner.graph.add_edge(
            a,
            d,
            EdgeData {
                kind: EdgeKind::Located,
                attrs: AttrMap::new(),
            },
        );
        Ok(())
    }

    async fn shortest_path(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        directed: bool,
    ) -> Result<f64, StoreError> {
        let inner = self.inner.read().await;
        let a = inner.resolve(from)?;
        let b = inner.resolve(to)?;

        // Project the stored graph onto a weighted scratch graph holding
        // only the requested edge kind, mirrored when undirected.
        let mut scratch: Graph<(), f64> = Graph::new();
        let mut mapping: BTreeMap<NodeIndex, NodeIndex> = BTreeMap::new();
        for idx in inner.graph.node_indices() {
            mapping.insert(idx, scratch.add_node(()));
        }
        for edge in inner.graph.edge_references() {
            if edge.weight().kind != kind {
                continue;
            }
            let cost = edge_cost(&edge.weight().attrs);
            if let (Some(&s), Some(&t)) =
                (mapping.get(&edge.source()), mapping.get(&edge.target()))
            {
                scratch.add_edge(s, t, cost);
                if !directed {
                    scratch.add_edge(t, s, cost);
                }
            }
        }

        let (start, goal) = match (mapping.get(&a), mapping.get(&b)) {
            (Some(&s), Some(&g)) => (s, g),
            _ => {
                return Err(StoreError::MissingEntity {
                    reference: from.clone(),
                });
            }
        };
        let costs = petgraph::algo::dijkstra(&scratch, start, Some(goal), |e| *e.weight());
        costs
            .get(&goal)
            .copied()
            .ok_or_else(|| StoreError::backend(format!("no {kind} path from {from} to {to}")))
    }

    async fn community_detection(
        &self,
        node_kind: &str,
        edge_kind: EdgeKind,
        seed_attribute: Option<&str>,
    ) -> Result<Vec<CommunityAssignment>, StoreError> {
        let inner = self.inner.read().await;
        Ok(propagate_labels(&inner, node_kind, edge_kind, seed_attribute))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.graph.clear();
        inner.index.clear();
        Ok(())
    }
}

fn edge_cost(attrs: &AttrMap) -> f64 {
    attrs.get("cost").and_then(AttrValue::as_f64).unwrap_or(1.0)
}

/// Asynchronous label propagation, optionally seeded.
///
/// Each entity starts from its seed attribute (when seeded detection was
/// requested and the attribute is set) or from its own numeric id.
/// Sweeps run in ascending entity order; each entity adopts the most
/// frequent label among its neighbors over the chosen edge kind (both
/// directions), breaking ties toward the smallest label. Converges when
/// one full sweep changes nothing. This engine reports single-level
/// communities: the intermediate list is always empty.
fn propagate_labels(
    inner: &Inner,
    node_kind: &str,
    edge_kind: EdgeKind,
    seed_attribute: Option<&str>,
) -> Vec<CommunityAssignment> {
    // Members of the detection, in deterministic order.
    let mut members: Vec<(NodeIndex, EntityRef)> = inner
        .index
        .values()
        .filter_map(|&idx| {
            inner
                .graph
                .node_weight(idx)
                .map(|d| (idx, d.reference.clone()))
        })
        .filter(|(_, r)| r.kind == node_kind)
        .collect();
    members.sort_by(|(_, a), (_, b)| a.cmp(b));

    let mut labels: BTreeMap<NodeIndex, i64> = BTreeMap::new();
    for (pos, (idx, reference)) in members.iter().enumerate() {
        let seed = seed_attribute
            .and_then(|attr| inner.graph.node_weight(*idx).and_then(|d| d.attrs.get(attr)))
            .and_then(AttrValue::as_i64);
        let own = reference
            .id
            .as_num()
            .unwrap_or_else(|| i64::try_from(pos).unwrap_or(i64::MAX));
        labels.insert(*idx, seed.unwrap_or(own));
    }

    for _ in 0..MAX_PROPAGATION_SWEEPS {
        let mut changed = false;
        for (idx, _) in &members {
            let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
            for neighbor in inner.symmetric_neighbors(*idx, edge_kind) {
                if let Some(&label) = labels.get(&neighbor) {
                    let slot = counts.entry(label).or_insert(0);
                    *slot = slot.saturating_add(1);
                }
            }
            // Most frequent neighbor label, smallest label on ties.
            let best = counts
                .iter()
                .max_by(|(la, ca), (lb, cb)| ca.cmp(cb).then(lb.cmp(la)))
                .map(|(&label, _)| label);
            if let Some(best) = best {
                if labels.get(idx) != Some(&best) {
                    labels.insert(*idx, best);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    members
        .into_iter()
        .filter_map(|(idx, reference)| {
            labels.get(&idx).map(|&label| CommunityAssignment {
                entity: reference,
                final_community: label,
                intermediate: Vec::new(),
            })
        })
        .collect()
}
