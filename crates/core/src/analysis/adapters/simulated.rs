//! Offline analysis backend used by the CLI and demos.
//!
//! Produces deterministic analyses from item content so that the whole
//! pipeline can be exercised without a network provider.

use crate::analysis::base::{AnalysisClient, AnalysisError, ItemAnalysis};
use async_trait::async_trait;
use rp_protocol::ResearchItem;
use std::time::Duration;

/// Deterministic stand-in for an LLM provider.
///
/// Items whose content contains `[transient]` fail with a rate limit on
/// every call; items containing `[invalid]` are rejected as invalid input.
pub struct SimulatedClient {
    latency: Duration,
}

impl SimulatedClient {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedClient {
    fn default() -> Self {
        Self::new(Duration::from_millis(150))
    }
}

#[async_trait]
impl AnalysisClient for SimulatedClient {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn analyze(&self, item: &ResearchItem) -> Result<ItemAnalysis, AnalysisError> {
        tokio::time::sleep(self.latency).await;

        if item.content.contains("[invalid]") {
            return Err(AnalysisError::InvalidInput(format!(
                "item {} cannot be analyzed",
                item.id
            )));
        }
        if item.content.contains("[transient]") {
            return Err(AnalysisError::RateLimited("simulated quota exceeded".to_string()));
        }

        let subject = item
            .content
            .split_whitespace()
            .take(6)
            .collect::<Vec<_>>()
            .join(" ");
        let words = item.content.split_whitespace().count();
        // Longer material yields more confident analyses, capped at 0.95.
        let confidence = (0.5 + words as f64 / 200.0).min(0.95);

        Ok(ItemAnalysis::new(confidence)
            .with_insight(format!("{}: {subject}", item.source))
            .with_insight("Demand is consolidating around a few platforms".to_string())
            .with_recommendation(format!("Track developments in {}", item.source))
            .with_risk("Regulatory uncertainty".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_client_is_deterministic() {
        let client = SimulatedClient::new(Duration::ZERO);
        let item = ResearchItem::new("i1", "market", "Edge accelerators grow quickly");

        let first = client.analyze(&item).await.unwrap();
        let second = client.analyze(&item).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.insights[0], "market: Edge accelerators grow quickly");
    }

    #[tokio::test]
    async fn test_simulated_client_failure_markers() {
        let client = SimulatedClient::new(Duration::ZERO);

        let invalid = ResearchItem::new("i1", "s", "bad [invalid]");
        assert!(!client.analyze(&invalid).await.unwrap_err().is_transient());

        let transient = ResearchItem::new("i2", "s", "flaky [transient]");
        assert!(client.analyze(&transient).await.unwrap_err().is_transient());
    }
}
