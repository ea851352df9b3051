//! Scripted analysis client for testing.

use crate::analysis::base::{AnalysisClient, AnalysisError, ItemAnalysis};
use async_trait::async_trait;
use rp_protocol::ResearchItem;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Clone)]
enum Failure {
    Always(AnalysisError),
    Times(u32, AnalysisError),
}

/// Holds the analysis of one item until released.
///
/// Lets tests act (pause, stop) while a specific item is in flight.
#[derive(Clone, Default)]
pub struct ItemGate {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

impl ItemGate {
    /// Wait until the held item's analysis has begun.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Let the held item's analysis finish.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// An [`AnalysisClient`] whose per-item behaviour is scripted up front.
///
/// Items without a script succeed with a deterministic analysis derived
/// from the item id.
pub struct ScriptedClient {
    name: String,
    available: bool,
    delay: Option<Duration>,
    failures: HashMap<String, Failure>,
    responses: HashMap<String, ItemAnalysis>,
    gates: HashMap<String, ItemGate>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn succeeding() -> Self {
        Self {
            name: "scripted".to_string(),
            available: true,
            delay: None,
            failures: HashMap::new(),
            responses: HashMap::new(),
            gates: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::succeeding()
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Every call for `item_id` fails with `error`.
    pub fn fail_always(mut self, item_id: &str, error: AnalysisError) -> Self {
        self.failures
            .insert(item_id.to_string(), Failure::Always(error));
        self
    }

    /// The first `times` calls for `item_id` fail with `error`.
    pub fn fail_times(mut self, item_id: &str, times: u32, error: AnalysisError) -> Self {
        self.failures
            .insert(item_id.to_string(), Failure::Times(times, error));
        self
    }

    pub fn with_response(mut self, item_id: &str, analysis: ItemAnalysis) -> Self {
        self.responses.insert(item_id.to_string(), analysis);
        self
    }

    /// Delay applied to every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Hold the analysis of `item_id` until the returned gate is released.
    pub fn hold(&mut self, item_id: &str) -> ItemGate {
        let gate = ItemGate::default();
        self.gates.insert(item_id.to_string(), gate.clone());
        gate
    }

    /// Item ids in call order, one entry per call.
    pub fn calls(&self) -> Vec<String> {
        self.lock_calls().clone()
    }

    pub fn calls_for(&self, item_id: &str) -> u32 {
        self.lock_calls().iter().filter(|id| *id == item_id).count() as u32
    }

    /// The analysis returned for `item_id` when it succeeds.
    pub fn default_analysis(item_id: &str) -> ItemAnalysis {
        ItemAnalysis::new(0.8)
            .with_insight(format!("Insight from {item_id}"))
            .with_recommendation(format!("Recommendation for {item_id}"))
            .with_risk(format!("Risk in {item_id}"))
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<String>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AnalysisClient for ScriptedClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_availability(&self) -> bool {
        self.available
    }

    async fn analyze(&self, item: &ResearchItem) -> Result<ItemAnalysis, AnalysisError> {
        let call_number = {
            let mut calls = self.lock_calls();
            calls.push(item.id.clone());
            calls.iter().filter(|id| **id == item.id).count() as u32
        };

        if let Some(gate) = self.gates.get(&item.id) {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.failures.get(&item.id) {
            Some(Failure::Always(error)) => return Err(error.clone()),
            Some(Failure::Times(times, error)) if call_number <= *times => {
                return Err(error.clone())
            }
            _ => {}
        }

        Ok(self
            .responses
            .get(&item.id)
            .cloned()
            .unwrap_or_else(|| Self::default_analysis(&item.id)))
    }
}
