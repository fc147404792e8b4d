//! Per-node agent itinerary queues.
//!
//! Nodes that predict agent behaviour commit each agent's full future
//! itinerary into a queue the first time the agent arrives: the tick at
//! which the agent leaves, its destination, and how long it has waited.
//! Subsequent ticks replay the queued decision instead of re-running the
//! choice pipeline. The queue is serialized to JSON and stored as a node
//! attribute so every subsystem process sees the same itineraries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A committed itinerary entry for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedChoice {
    /// Name of the destination node.
    pub destination: String,
    /// Ticks the agent will have waited at the node when it leaves.
    pub wait_time: u64,
}

/// Queue of future departures: tick -> agent id -> committed itinerary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeQueue(pub BTreeMap<u64, BTreeMap<i64, QueuedChoice>>);

impl NodeQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// All agent ids present anywhere in the queue.
    pub fn queued_agent_ids(&self) -> Vec<i64> {
        self.0
            .values()
            .flat_map(|agents| agents.keys().copied())
            .collect()
    }

    /// The entries due at the given tick, if any.
    pub fn entries_at(&self, tick: u64) -> Option<&BTreeMap<i64, QueuedChoice>> {
        self.0.get(&tick)
    }

    /// Commit an itinerary entry for an agent at a future tick.
    pub fn insert(&mut self, tick: u64, agent_id: i64, choice: QueuedChoice) {
        self.0.entry(tick).or_default().insert(agent_id, choice);
    }

    /// Drop the whole bucket for a consumed tick.
    pub fn remove_tick(&mut self, tick: u64) {
        self.0.remove(&tick);
    }

    /// True if no entries remain.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn queued_ids_span_all_ticks() {
        let mut q = NodeQueue::new();
        q.insert(
            3,
            1,
            QueuedChoice {
                destination: "ward".to_owned(),
                wait_time: 2,
            },
        );
        q.insert(
            5,
            2,
            QueuedChoice {
                destination: "home".to_owned(),
                wait_time: 4,
            },
        );
        let mut ids = q.queued_agent_ids();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn consumed_bucket_is_dropped() {
        let mut q = NodeQueue::new();
        q.insert(
            3,
            1,
            QueuedChoice {
                destination: "ward".to_owned(),
                wait_time: 2,
            },
        );
        assert!(q.entries_at(3).is_some());
        q.remove_tick(3);
        assert!(q.entries_at(3).is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn queue_roundtrips_through_json() {
        let mut q = NodeQueue::new();
        q.insert(
            7,
            42,
            QueuedChoice {
                destination: "clinic".to_owned(),
                wait_time: 1,
            },
        );
        let json = serde_json::to_string(&q).unwrap();
        let back: NodeQueue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }
}
