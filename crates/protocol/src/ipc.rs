//! Control and update protocol.
//!
//! This module defines the message types exchanged between transport
//! adapters (HTTP routes, WebSocket relays) and the pipeline core.
//!
//! The protocol follows an Operation/Event pattern:
//! - `Op`: control commands sent to the core
//! - `Event`: updates fanned out by the core's update bus
//!
//! Events come in three shapes: stage updates, process status updates and
//! free-text live log lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::process_models::{
    ProcessFailure, ProcessId, ProcessState, ProcessStatus, ResearchRequest, StageName,
    StageStatus,
};

/// Control operations accepted by the orchestrator.
///
/// Uses tagged enum serialization for TypeScript compatibility:
/// ```json
/// {
///   "type": "pauseProcess",
///   "payload": { "process_id": "7d0c..." }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Op {
    /// Start a new process. A missing id is generated by the core.
    StartProcess {
        process_id: Option<ProcessId>,
        request: ResearchRequest,
    },

    /// Suspend a running process at its next checkpoint.
    PauseProcess { process_id: ProcessId },

    /// Continue a paused process from its checkpoint.
    ResumeProcess { process_id: ProcessId },

    /// Cancel a process. No-op for processes that already finished.
    StopProcess { process_id: ProcessId },

    /// Request a snapshot of one process.
    GetProcessState { process_id: ProcessId },

    /// Request snapshots of every tracked process.
    ListProcesses,
}

/// Successful replies to an [`Op`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum OpReply {
    Started { process_id: ProcessId },
    Accepted { process_id: ProcessId },
    State(Box<ProcessState>),
    Processes(Vec<ProcessState>),
}

/// Progress of one stage of one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct StageUpdate {
    pub process_id: ProcessId,
    pub stage_name: StageName,
    pub status: StageStatus,
    pub progress: u8,
    pub detail: String,
}

/// Status transition of a whole process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ProcessUpdate {
    pub process_id: ProcessId,
    pub status: ProcessStatus,

    /// Index of the current stage at the time of the transition.
    pub stage_index: usize,

    /// Present when `status` is `ERROR`.
    pub failure: Option<ProcessFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Free-text progress message for the live log panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct LiveLogLine {
    pub process_id: ProcessId,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: LogSeverity,
}

/// Updates published by the core.
///
/// ```json
/// {
///   "type": "stageUpdate",
///   "payload": {
///     "process_id": "7d0c...",
///     "stage_name": "analysis",
///     "status": "running",
///     "progress": 66,
///     "detail": "Analyzed 2 of 3 items"
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    StageUpdate(StageUpdate),
    ProcessUpdate(ProcessUpdate),
    LiveLog(LiveLogLine),
}

impl Event {
    /// The process this event belongs to.
    pub fn process_id(&self) -> &ProcessId {
        match self {
            Event::StageUpdate(update) => &update.process_id,
            Event::ProcessUpdate(update) => &update.process_id,
            Event::LiveLog(line) => &line.process_id,
        }
    }

    /// Whether this event moves its process into a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::ProcessUpdate(update) if update.status.is_terminal())
    }
}
