//! Errors returned by the process control surface.
//!
//! These are reported synchronously to the caller of a control operation
//! and never stored in a process's state.

use rp_protocol::{ProcessId, ProcessStatus};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("Process {0} not found")]
    NotFound(ProcessId),

    #[error("Process {0} is already running")]
    AlreadyRunning(ProcessId),

    #[error("Cannot {operation} process {process_id} while it is {status:?}")]
    InvalidState {
        process_id: ProcessId,
        status: ProcessStatus,
        operation: &'static str,
    },
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
