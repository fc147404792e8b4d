//! Fault-injection tests for the retry discipline.
//!
//! A wrapper backend injects failures ahead of a real in-memory backend
//! to prove three properties of the client: transient failures within
//! the attempt budget are absorbed, exhausting the budget surfaces
//! `RetriesExhausted`, and non-transient failures are never retried.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use starling_store::backend::CommunityAssignment;
use starling_store::{GraphBackend, GraphClient, MemoryBackend, RetryPolicy, StoreError};
use starling_types::{AttrMap, AttrValue, EdgeKind, EntityRef};

/// Injects a fixed number of failures before delegating.
struct FlakyBackend {
    inner: MemoryBackend,
    failures_left: AtomicU32,
    calls: AtomicU32,
    transient: bool,
}

impl FlakyBackend {
    fn new(failures: u32, transient: bool) -> Self {
        Self {
            inner: MemoryBackend::new(),
            failures_left: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            transient,
        }
    }

    fn fault(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining == 0 {
            return Ok(());
        }
        self.failures_left
            .store(remaining.saturating_sub(1), Ordering::SeqCst);
        if self.transient {
            Err(StoreError::transient("injected timeout"))
        } else {
            Err(StoreError::backend("injected fatal failure"))
        }
    }
}

#[async_trait]
impl GraphBackend for FlakyBackend {
    async fn get_entity(&self, reference: &EntityRef) -> Result<AttrMap, StoreError> {
        self.fault()?;
        self.inner.get_entity(reference).await
    }

    async fn entity_exists(&self, reference: &EntityRef) -> Result<bool, StoreError> {
        self.fault()?;
        self.inner.entity_exists(reference).await
    }

    async fn create_entity(&self, reference: &EntityRef, attrs: AttrMap) -> Result<(), StoreError> {
        self.fault()?;
        self.inner.create_entity(reference, attrs).await
    }

    async fn delete_entity(&self, reference: &EntityRef) -> Result<(), StoreError> {
        self.fault()?;
        self.inner.delete_entity(reference).await
    }

    async fn set_attribute(
        &self,
        reference: &EntityRef,
        name: &str,
        value: AttrValue,
    ) -> Result<(), StoreError> {
        self.fault()?;
        self.inner.set_attribute(reference, name, value).await
    }

    async fn get_attribute(
        &self,
        reference: &EntityRef,
        name: &str,
    ) -> Result<Option<AttrValue>, StoreError> {
        self.fault()?;
        self.inner.get_attribute(reference, name).await
    }

    async fn max_numeric_id(&self, kind: &str) -> Result<Option<i64>, StoreError> {
        self.fault()?;
        self.inner.max_numeric_id(kind).await
    }

    async fn entities_of_kind(&self, kind: &str) -> Result<Vec<EntityRef>, StoreError> {
        self.fault()?;
        self.inner.entities_of_kind(kind).await
    }

    async fn create_edge(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        attrs: AttrMap,
    ) -> Result<(), StoreError> {
        self.fault()?;
        self.inner.create_edge(from, to, kind, attrs).await
    }

    async fn delete_edge(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
    ) -> Result<u64, StoreError> {
        self.fault()?;
        self.inner.delete_edge(from, to, kind).await
    }

    async fn edge_exists(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
    ) -> Result<bool, StoreError> {
        self.fault()?;
        self.inner.edge_exists(from, to, kind).await
    }

    async fn set_edge_attribute(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        name: &str,
        value: AttrValue,
    ) -> Result<(), StoreError> {
        self.fault()?;
        self.inner
            .set_edge_attribute(from, to, kind, name, value)
            .await
    }

    async fn get_edge_attribute(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        name: &str,
    ) -> Result<Option<AttrValue>, StoreError> {
        self.fault()?;
        self.inner.get_edge_attribute(from, to, kind, name).await
    }

    async fn out_neighbors(
        &self,
        reference: &EntityRef,
        kind: EdgeKind,
    ) -> Result<Vec<(EntityRef, AttrMap)>, StoreError> {
        self.fault()?;
        self.inner.out_neighbors(reference, kind).await
    }

    async fn in_neighbors(
        &self,
        reference: &EntityRef,
        kind: EdgeKind,
    ) -> Result<Vec<(EntityRef, AttrMap)>, StoreError> {
        self.fault()?;
        self.inner.in_neighbors(reference, kind).await
    }

    async fn relocate_agent(
        &self,
        agent: &EntityRef,
        destination: &EntityRef,
    ) -> Result<(), StoreError> {
        self.fault()?;
        self.inner.relocate_agent(agent, destination).await
    }

    async fn shortest_path(
        &self,
        from: &EntityRef,
        to: &EntityRef,
        kind: EdgeKind,
        directed: bool,
    ) -> Result<f64, StoreError> {
        self.fault()?;
        self.inner.shortest_path(from, to, kind, directed).await
    }

    async fn community_detection(
        &self,
        node_kind: &str,
        edge_kind: EdgeKind,
        seed_attribute: Option<&str>,
    ) -> Result<Vec<CommunityAssignment>, StoreError> {
        self.fault()?;
        self.inner
            .community_detection(node_kind, edge_kind, seed_attribute)
            .await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.fault()?;
        self.inner.clear().await
    }
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

#[tokio::test]
async fn transient_failures_within_budget_are_absorbed() {
    let backend = Arc::new(FlakyBackend::new(2, true));
    let client = GraphClient::new(Arc::clone(&backend) as Arc<dyn GraphBackend>, fast_policy(4));

    client
        .create_entity(&EntityRef::node("home"), AttrMap::new())
        .await
        .expect("two transient failures fit in a four-attempt budget");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausting_the_budget_yields_retries_exhausted() {
    let backend = Arc::new(FlakyBackend::new(u32::MAX, true));
    let client = GraphClient::new(Arc::clone(&backend) as Arc<dyn GraphBackend>, fast_policy(3));

    let err = client
        .create_entity(&EntityRef::node("home"), AttrMap::new())
        .await
        .unwrap_err();
    match err {
        StoreError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(last.is_transient());
        }
        other => panic!("expected RetriesExhausted, got {other}"),
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn fatal_failures_are_never_retried() {
    let backend = Arc::new(FlakyBackend::new(1, false));
    let client = GraphClient::new(Arc::clone(&backend) as Arc<dyn GraphBackend>, fast_policy(8));

    let err = client
        .create_entity(&EntityRef::node("home"), AttrMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Backend { .. }));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn the_store_is_intact_after_absorbed_failures() {
    let backend = Arc::new(FlakyBackend::new(1, true));
    let client = GraphClient::new(Arc::clone(&backend) as Arc<dyn GraphBackend>, fast_policy(4));

    client
        .create_entity(&EntityRef::node("home"), AttrMap::new())
        .await
        .unwrap();
    client
        .update_node(&EntityRef::node("home"), "capacity", AttrValue::Int(5))
        .await
        .unwrap();
    assert_eq!(
        client
            .get_node_value(&EntityRef::node("home"), "capacity")
            .await
            .unwrap(),
        Some(AttrValue::Int(5))
    );
}
