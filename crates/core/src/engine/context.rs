//! Execution context handed to each stage.

use crate::bus::UpdateBus;
use crate::state::handle::{ProcessHandle, ProcessInner, Signal};
use crate::state::process::{log_to_process, set_stage_progress};
use rp_protocol::{LogSeverity, ProcessId, ResearchRequest, StageName};
use std::sync::Arc;
use tokio::sync::MutexGuard;
use tokio_util::sync::CancellationToken;

/// Gives a stage access to its process's accumulated data and to the bus.
///
/// Every state access goes through the process lock; stages must not hold
/// the guard across a call to the analysis or collection capability.
#[derive(Clone)]
pub struct StageContext {
    handle: Arc<ProcessHandle>,
    bus: UpdateBus,
}

impl StageContext {
    pub fn new(handle: Arc<ProcessHandle>, bus: UpdateBus) -> Self {
        Self { handle, bus }
    }

    pub fn process_id(&self) -> &ProcessId {
        self.handle.id()
    }

    pub fn bus(&self) -> &UpdateBus {
        &self.bus
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        self.handle.cancel_token()
    }

    pub async fn lock(&self) -> MutexGuard<'_, ProcessInner> {
        self.handle.lock().await
    }

    pub async fn request(&self) -> ResearchRequest {
        self.lock().await.state.request.clone()
    }

    /// Current control signal; stages call this at every safe checkpoint.
    pub async fn checkpoint(&self) -> Signal {
        self.lock().await.signal
    }

    /// Report stage progress; ignored once the process is terminal.
    pub async fn progress(&self, stage: StageName, progress: u8, detail: impl Into<String>) {
        let mut inner = self.lock().await;
        if !inner.state.status.is_terminal() {
            set_stage_progress(&mut inner.state, &self.bus, stage, progress, detail);
        }
    }

    /// Emit a live log line; ignored once the process is terminal.
    pub async fn log(&self, severity: LogSeverity, message: impl Into<String>) {
        let inner = self.lock().await;
        if !inner.state.status.is_terminal() {
            log_to_process(&inner.state, &self.bus, severity, message);
        }
    }
}
