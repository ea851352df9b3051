//! Test fixtures for building orchestrators and sample data.

use rp_core::analysis::base::AnalysisClient;
use rp_core::analysis::retry::RetryPolicy;
use rp_core::collect::{Collector, StaticCollector};
use rp_core::{ProcessOrchestrator, StageRunner, UpdateBus};
use rp_protocol::{ResearchItem, ResearchRequest};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Retry policy with millisecond backoff so retry tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        item_timeout: Duration::from_secs(5),
    }
}

/// Items `ids`, each with a short non-empty content.
pub fn research_items(ids: &[&str]) -> Vec<ResearchItem> {
    ids.iter()
        .map(|id| ResearchItem::new(*id, "fixture", format!("Findings about {id}")))
        .collect()
}

pub fn request() -> ResearchRequest {
    ResearchRequest::new("edge AI accelerators")
}

/// Orchestrator over a fixed item list and the given client.
pub fn orchestrator_with(
    items: Vec<ResearchItem>,
    client: Arc<dyn AnalysisClient>,
) -> ProcessOrchestrator {
    orchestrator_with_collector(Arc::new(StaticCollector::new(items)), client, fast_retry())
}

pub fn orchestrator_with_collector(
    collector: Arc<dyn Collector>,
    client: Arc<dyn AnalysisClient>,
    retry: RetryPolicy,
) -> ProcessOrchestrator {
    let runner = StageRunner::new(collector, client).with_retry_policy(retry);
    ProcessOrchestrator::new(runner, UpdateBus::new(1024))
}

/// Create a temporary project directory with `.research-pipeline` configuration.
///
/// Returns a TempDir that must be kept alive for the test duration.
#[allow(dead_code)]
pub fn create_test_project() -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let root = temp_dir.path();

    std::fs::create_dir_all(root.join(".research-pipeline/templates"))?;

    let config_toml = r#"
[retry]
max_attempts = 2
base_delay_ms = 1

[aggregation]
max_insights = 3
"#;
    std::fs::write(root.join(".research-pipeline/config.toml"), config_toml)?;

    let template = r#"---
name: market-scan
category: market
topic: edge AI accelerators
focus_areas:
  - market size
  - competitors
  - regulation
---

- Who are the key players?
"#;
    std::fs::write(
        root.join(".research-pipeline/templates/market-scan.md"),
        template,
    )?;

    Ok(temp_dir)
}
