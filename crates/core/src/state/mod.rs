//! State management for research processes.
//!
//! This module provides:
//! - Process state machine helpers that emit bus events
//! - Per-process handles and the process registry
//! - The `ProcessOrchestrator` control surface

pub mod error;
pub mod handle;
pub mod orchestrator;
pub mod process;
pub mod registry;

pub use error::{OrchestratorError, OrchestratorResult};
pub use handle::{ProcessHandle, Signal};
pub use orchestrator::ProcessOrchestrator;
