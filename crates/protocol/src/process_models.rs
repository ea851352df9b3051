//! Runtime process state models.
//!
//! This module defines the structures for tracking the state of research
//! processes as they move through the four pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::analysis_models::{AggregatedResult, AnalysisOutcome, ResearchItem, ResearchReport};

/// Opaque identifier of a research process.
///
/// Either supplied by the caller (e.g. a database row id rendered as a
/// string) or generated with [`ProcessId::generate`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, TS)]
pub struct ProcessId(pub String);

impl ProcessId {
    /// Create a fresh, system-generated identifier (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProcessId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProcessId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle status of a research process.
///
/// Normal execution: Running -> Completed.
/// `Paused` may alternate with `Running` any number of times.
/// `Completed`, `Error` and `Stopped` are terminal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
    /// Process is actively executing its stage sequence.
    Running,

    /// Process has been suspended by the user.
    Paused,

    /// Every stage completed.
    Completed,

    /// A stage failed fatally; see [`ProcessState::failure`].
    Error,

    /// Process was stopped by the user.
    Stopped,
}

impl ProcessStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Stopped)
    }
}

/// The four fixed pipeline stages, in execution order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Collection,
    Validation,
    Analysis,
    Report,
}

impl StageName {
    /// All stages in execution order.
    pub const ALL: [StageName; 4] = [
        StageName::Collection,
        StageName::Validation,
        StageName::Analysis,
        StageName::Report,
    ];

    /// Human-readable label used in live logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Collection => "Data collection",
            Self::Validation => "Validation & enrichment",
            Self::Analysis => "AI analysis",
            Self::Report => "Report generation",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Collection => "collection",
            Self::Validation => "validation",
            Self::Analysis => "analysis",
            Self::Report => "report",
        };
        f.write_str(name)
    }
}

/// Status of a single stage.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    /// Non-advancing: the in-flight stage of a paused process, or the
    /// interrupted stage of a stopped one.
    Suspended,
    Completed,
    Error,
}

/// Progress of one pipeline stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct StageState {
    pub name: StageName,
    pub status: StageStatus,

    /// Percentage in `0..=100`. Never decreases; forced to 100 on completion.
    pub progress: u8,

    /// Short description of the current activity.
    pub detail: String,
}

impl StageState {
    pub fn pending(name: StageName) -> Self {
        Self {
            name,
            status: StageStatus::Pending,
            progress: 0,
            detail: String::new(),
        }
    }
}

/// Failing stage and diagnostic of a process in `Error` status.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ProcessFailure {
    pub stage: StageName,
    pub message: String,
}

/// What a process should research.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct ResearchRequest {
    /// Subject of the research, e.g. "edge AI accelerators".
    pub topic: String,

    /// Areas to focus on. Empty means a general overview.
    #[serde(default)]
    pub focus_areas: Vec<String>,

    /// Extra instructions forwarded to collection sources.
    #[serde(default)]
    pub prompts: Vec<String>,
}

impl ResearchRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    pub fn with_focus_areas<I, S>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.focus_areas = areas.into_iter().map(Into::into).collect();
        self
    }
}

/// Complete state of one research process.
///
/// Snapshots of this structure are what `get_state` hands out; the live
/// copy is only ever mutated by the owning orchestrator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ProcessState {
    pub id: ProcessId,
    pub request: ResearchRequest,
    pub status: ProcessStatus,

    /// One entry per stage, in execution order. Always four entries.
    pub stages: Vec<StageState>,

    /// Index into `stages` of the stage being executed, or the stage to
    /// re-enter after a pause. Equals `stages.len()` once all are done.
    pub current_stage: usize,

    pub collected_items: Vec<ResearchItem>,

    /// Grows monotonically during the analysis stage.
    pub analysis_outcomes: Vec<AnalysisOutcome>,

    pub aggregated_result: Option<AggregatedResult>,
    pub report: Option<ResearchReport>,
    pub failure: Option<ProcessFailure>,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProcessState {
    /// Fresh state: every stage pending, status running.
    pub fn new(id: ProcessId, request: ResearchRequest) -> Self {
        Self {
            id,
            request,
            status: ProcessStatus::Running,
            stages: StageName::ALL.iter().copied().map(StageState::pending).collect(),
            current_stage: 0,
            collected_items: Vec::new(),
            analysis_outcomes: Vec::new(),
            aggregated_result: None,
            report: None,
            failure: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn stage(&self, name: StageName) -> Option<&StageState> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn stage_mut(&mut self, name: StageName) -> Option<&mut StageState> {
        self.stages.iter_mut().find(|s| s.name == name)
    }

    /// The stage at `current_stage`, if any remain.
    pub fn active_stage(&self) -> Option<&StageState> {
        self.stages.get(self.current_stage)
    }
}
