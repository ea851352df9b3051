//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! host application installs a recorder.

use crate::engine::StageOutcome;
use metrics::{counter, gauge, histogram};
use rp_protocol::{AnalysisOutcome, OutcomeStatus, ProcessStatus, StageName};
use std::time::Duration;

/// Processes that have not reached a terminal status.
pub const PROCESSES_ACTIVE: &str = "research_processes_active";
/// Processes by terminal status.
pub const PROCESSES_FINISHED: &str = "research_processes_finished_total";
/// Analysed items by outcome status.
pub const ITEMS_ANALYZED: &str = "research_items_analyzed_total";
/// Attempts spent per analysed item.
pub const ITEM_ATTEMPTS: &str = "research_item_attempts";
/// Wall time of one stage run, labelled by stage and outcome.
pub const STAGE_DURATION: &str = "research_stage_duration_seconds";

pub(crate) fn process_started() {
    gauge!(PROCESSES_ACTIVE).increment(1.0);
}

pub(crate) fn process_finished(status: ProcessStatus) {
    gauge!(PROCESSES_ACTIVE).decrement(1.0);
    counter!(PROCESSES_FINISHED, "status" => status_label(status)).increment(1);
}

pub(crate) fn item_analyzed(outcome: &AnalysisOutcome) {
    let status = match outcome.status {
        OutcomeStatus::Completed => "completed",
        OutcomeStatus::Failed => "failed",
    };
    counter!(ITEMS_ANALYZED, "status" => status).increment(1);
    histogram!(ITEM_ATTEMPTS).record(f64::from(outcome.attempts));
}

pub(crate) fn stage_finished(stage: StageName, outcome: &StageOutcome, elapsed: Duration) {
    let result = match outcome {
        StageOutcome::Completed => "completed",
        StageOutcome::Suspended => "suspended",
        StageOutcome::Stopped => "stopped",
        StageOutcome::Failed { .. } => "failed",
    };
    histogram!(STAGE_DURATION, "stage" => stage_label(stage), "outcome" => result)
        .record(elapsed.as_secs_f64());
}

fn status_label(status: ProcessStatus) -> &'static str {
    match status {
        ProcessStatus::Running => "running",
        ProcessStatus::Paused => "paused",
        ProcessStatus::Completed => "completed",
        ProcessStatus::Error => "error",
        ProcessStatus::Stopped => "stopped",
    }
}

fn stage_label(stage: StageName) -> &'static str {
    match stage {
        StageName::Collection => "collection",
        StageName::Validation => "validation",
        StageName::Analysis => "analysis",
        StageName::Report => "report",
    }
}
