//! Analysis data models: collected items, per-item outcomes, the
//! aggregated summary and the generated report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::process_models::ProcessId;

/// One unit of input produced by the collection stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ResearchItem {
    pub id: String,

    /// Where the content came from (a URL, a provider name, a focus area).
    pub source: String,

    pub content: String,

    /// Enrichment data added by the validation stage.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ResearchItem {
    pub fn new(id: impl Into<String>, source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Completed,
    Failed,
}

/// Result of submitting one item to the analysis capability.
///
/// A failed outcome is kept in the process state: its `risk_notes` carry
/// the diagnostic and its confidence is 0.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct AnalysisOutcome {
    pub item_id: String,
    pub status: OutcomeStatus,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub risk_notes: Vec<String>,

    /// In `0.0..=1.0`.
    pub confidence: f64,

    /// Number of calls made to the analysis capability for this item.
    pub attempts: u32,

    pub timestamp: DateTime<Utc>,
}

impl AnalysisOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == OutcomeStatus::Completed
    }
}

/// Items attempted versus items analysed successfully.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct Coverage {
    pub total_items: usize,
    pub completed_items: usize,
    pub failed_items: usize,

    /// Ids of failed items, in analysis order.
    pub failed_item_ids: Vec<String>,
}

/// Deterministic merge of all per-item outcomes of one process.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct AggregatedResult {
    pub narrative_summary: String,
    pub top_insights: Vec<String>,
    pub key_recommendations: Vec<String>,
    pub critical_risks: Vec<String>,

    /// Mean confidence over completed outcomes; 0 when none completed.
    pub average_confidence: f64,

    pub coverage: Coverage,
}

/// Final artifact of the report stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ResearchReport {
    pub id: String,
    pub process_id: ProcessId,
    pub topic: String,
    pub generated_at: DateTime<Utc>,
    pub summary: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub risks: Vec<String>,
    pub coverage: Coverage,
}
