//! Per-item retry policy for the analysis stage.
//!
//! Every item resolves to an [`AnalysisOutcome`]: failures of a single item
//! are never propagated as errors, they become `failed` outcomes.

use crate::analysis::base::{AnalysisClient, AnalysisError, ItemAnalysis};
use chrono::Utc;
use rp_protocol::{AnalysisOutcome, OutcomeStatus, ResearchItem, RetrySettings};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,

    /// Upper bound on the whole retry loop of one item.
    pub item_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            item_timeout: Duration::from_millis(settings.item_timeout_ms),
        }
    }

    /// Delay after the given failed attempt (1-based): `base * 2^(attempt-1)`.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Build a `completed` outcome, clamping confidence into `0.0..=1.0`.
pub fn completed_outcome(item_id: &str, analysis: ItemAnalysis, attempts: u32) -> AnalysisOutcome {
    let confidence = if analysis.confidence.is_finite() {
        analysis.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    AnalysisOutcome {
        item_id: item_id.to_string(),
        status: OutcomeStatus::Completed,
        insights: analysis.insights,
        recommendations: analysis.recommendations,
        risk_notes: analysis.risk_notes,
        confidence,
        attempts,
        timestamp: Utc::now(),
    }
}

/// Build a `failed` outcome carrying the diagnostic in its risk notes.
pub fn failed_outcome(item_id: &str, diagnostic: String, attempts: u32) -> AnalysisOutcome {
    AnalysisOutcome {
        item_id: item_id.to_string(),
        status: OutcomeStatus::Failed,
        insights: Vec::new(),
        recommendations: Vec::new(),
        risk_notes: vec![diagnostic],
        confidence: 0.0,
        attempts,
        timestamp: Utc::now(),
    }
}

/// Analyze one item under the retry policy.
///
/// Transient errors are retried up to `max_attempts` with exponential
/// backoff; a permanent error ends the loop after that attempt. The whole
/// loop is bounded by `item_timeout`. Cancelling `cancel` interrupts a
/// pending backoff, never an in-flight call.
pub async fn analyze_with_retry(
    client: &dyn AnalysisClient,
    item: &ResearchItem,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> AnalysisOutcome {
    let attempts = AtomicU32::new(0);

    let result = tokio::time::timeout(
        policy.item_timeout,
        retry_loop(client, item, policy, cancel, &attempts),
    )
    .await;

    let attempts = attempts.load(Ordering::SeqCst);
    match result {
        Ok(Ok(analysis)) => completed_outcome(&item.id, analysis, attempts),
        Ok(Err(diagnostic)) => failed_outcome(&item.id, diagnostic, attempts),
        Err(_) => {
            warn!(item_id = %item.id, attempts, "item analysis timed out");
            failed_outcome(
                &item.id,
                format!(
                    "Analysis timed out after {}ms ({attempts} attempt(s))",
                    policy.item_timeout.as_millis()
                ),
                attempts,
            )
        }
    }
}

async fn retry_loop(
    client: &dyn AnalysisClient,
    item: &ResearchItem,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    attempts: &AtomicU32,
) -> Result<ItemAnalysis, String> {
    loop {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(item_id = %item.id, attempt, client = client.name(), "analyzing item");

        let err: AnalysisError = match client.analyze(item).await {
            Ok(analysis) => return Ok(analysis),
            Err(e) => e,
        };

        if !err.is_transient() {
            warn!(item_id = %item.id, attempt, error = %err, "permanent analysis failure");
            return Err(format!("Permanent failure: {err}"));
        }

        if attempt >= policy.max_attempts {
            warn!(item_id = %item.id, attempt, error = %err, "retries exhausted");
            return Err(format!("Failed after {attempt} attempt(s): {err}"));
        }

        let delay = policy.backoff_after(attempt);
        debug!(item_id = %item.id, attempt, delay_ms = delay.as_millis() as u64, error = %err, "transient failure, backing off");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                return Err(format!("Stopped before retry after {attempt} attempt(s): {err}"));
            }
        }
    }
}
