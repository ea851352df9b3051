//! Aggregation of per-item outcomes into one summary.
//!
//! Aggregation is pure and deterministic: the same outcome list always
//! yields the same [`AggregatedResult`].

use rp_protocol::{AggregatedResult, AggregationSettings, AnalysisOutcome, Coverage};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("No analysis outcomes to aggregate")]
    NoOutcomes,
}

/// Merges analysis outcomes, deduplicating and capping each list.
#[derive(Debug, Clone, Default)]
pub struct AnalysisAggregator {
    limits: AggregationSettings,
}

impl AnalysisAggregator {
    pub fn new(limits: AggregationSettings) -> Self {
        Self { limits }
    }

    /// Combine `outcomes` into a single summary.
    ///
    /// Insights, recommendations and risks come from completed outcomes,
    /// deduplicated by exact (case-sensitive) match in first-seen order and
    /// truncated to the configured caps. Failed outcomes count towards the
    /// item total and the coverage gap but not the confidence average.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::NoOutcomes`] for an empty list.
    pub fn aggregate(&self, outcomes: &[AnalysisOutcome]) -> Result<AggregatedResult, AggregationError> {
        if outcomes.is_empty() {
            return Err(AggregationError::NoOutcomes);
        }

        let completed: Vec<&AnalysisOutcome> = outcomes.iter().filter(|o| o.is_completed()).collect();

        let top_insights = dedup_capped(
            completed.iter().flat_map(|o| o.insights.iter()),
            self.limits.max_insights,
        );
        let key_recommendations = dedup_capped(
            completed.iter().flat_map(|o| o.recommendations.iter()),
            self.limits.max_recommendations,
        );
        let critical_risks = dedup_capped(
            completed.iter().flat_map(|o| o.risk_notes.iter()),
            self.limits.max_risks,
        );

        let average_confidence = if completed.is_empty() {
            0.0
        } else {
            completed.iter().map(|o| o.confidence).sum::<f64>() / completed.len() as f64
        };

        let coverage = Coverage {
            total_items: outcomes.len(),
            completed_items: completed.len(),
            failed_items: outcomes.len() - completed.len(),
            failed_item_ids: outcomes
                .iter()
                .filter(|o| !o.is_completed())
                .map(|o| o.item_id.clone())
                .collect(),
        };

        let narrative_summary = narrative(&coverage, average_confidence, &top_insights);

        Ok(AggregatedResult {
            narrative_summary,
            top_insights,
            key_recommendations,
            critical_risks,
            average_confidence,
            coverage,
        })
    }
}

fn dedup_capped<'a>(values: impl Iterator<Item = &'a String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|value| seen.insert(*value))
        .take(cap)
        .cloned()
        .collect()
}

fn narrative(coverage: &Coverage, average_confidence: f64, top_insights: &[String]) -> String {
    let mut summary = format!(
        "Analyzed {} item(s): {} completed, {} failed.",
        coverage.total_items, coverage.completed_items, coverage.failed_items
    );

    if coverage.completed_items == 0 {
        summary.push_str(" No item could be analyzed successfully.");
    } else {
        summary.push_str(&format!(
            " Average confidence across completed analyses: {average_confidence:.2}."
        ));
    }

    if let Some(first) = top_insights.first() {
        summary.push_str(&format!(" Leading insight: {first}."));
    }

    if coverage.failed_items > 0 {
        summary.push_str(&format!(
            " Coverage gap: {} item(s) could not be analyzed.",
            coverage.failed_items
        ));
    }

    summary
}
