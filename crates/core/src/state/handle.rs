//! Per-process ownership cell.
//!
//! Every tracked process owns one `ProcessHandle`. Its mutex serializes all
//! mutation of that process: control calls and the driver task both take
//! it, so a `pause` can never interleave with a stage transition.

use rp_protocol::{ProcessId, ProcessState, ResearchRequest};
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// What the driver should do at its next checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Run,
    Pause,
    Stop,
}

/// Mutable part of a process, guarded by the handle's lock.
#[derive(Debug)]
pub struct ProcessInner {
    pub state: ProcessState,
    pub signal: Signal,

    /// Whether a driver task currently owns the stage sequence.
    ///
    /// Only changed under the lock, so `resume` can decide whether it must
    /// spawn a new driver or whether the old one is still winding down.
    pub(crate) driver_active: bool,
}

pub struct ProcessHandle {
    id: ProcessId,
    inner: Mutex<ProcessInner>,
    cancel: CancellationToken,
}

impl ProcessHandle {
    /// Fresh handle for a process whose driver is about to be spawned.
    pub fn new(id: ProcessId, request: ResearchRequest) -> Self {
        let state = ProcessState::new(id.clone(), request);
        Self {
            id,
            inner: Mutex::new(ProcessInner {
                state,
                signal: Signal::Run,
                driver_active: true,
            }),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    pub async fn lock(&self) -> MutexGuard<'_, ProcessInner> {
        self.inner.lock().await
    }

    /// Deep copy of the current state.
    pub async fn snapshot(&self) -> ProcessState {
        self.inner.lock().await.state.clone()
    }

    /// Cancelled once the process is stopped.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
