//! Collectors for driving the collection stage from tests.

use async_trait::async_trait;
use rp_core::collect::{CollectError, Collector};
use rp_protocol::{ResearchItem, ResearchRequest};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Control side of a [`GatedCollector`].
#[derive(Clone, Default)]
pub struct CollectGate {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

impl CollectGate {
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Returns fixed items, but only once the gate is released.
pub struct GatedCollector {
    items: Vec<ResearchItem>,
    gate: CollectGate,
    calls: AtomicU32,
}

impl GatedCollector {
    pub fn new(items: Vec<ResearchItem>) -> (Self, CollectGate) {
        let gate = CollectGate::default();
        let collector = Self {
            items,
            gate: gate.clone(),
            calls: AtomicU32::new(0),
        };
        (collector, gate)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Collector for GatedCollector {
    async fn collect(&self, _request: &ResearchRequest) -> Result<Vec<ResearchItem>, CollectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.started.notify_one();
        self.gate.release.notified().await;
        Ok(self.items.clone())
    }
}

/// Always fails.
pub struct FailingCollector;

#[async_trait]
impl Collector for FailingCollector {
    async fn collect(&self, _request: &ResearchRequest) -> Result<Vec<ResearchItem>, CollectError> {
        Err(CollectError::Unavailable("search provider offline".to_string()))
    }
}
