//! Registry of tracked processes.

use crate::state::handle::ProcessHandle;
use rp_protocol::ProcessId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

pub type ProcessMap = HashMap<ProcessId, Arc<ProcessHandle>>;

/// Maps process ids to their handles.
///
/// The registry lock only guards insert, lookup and removal; mutation of a
/// process goes through that process's own handle lock. When both are
/// needed the registry lock is taken first.
#[derive(Default)]
pub struct ProcessRegistry {
    processes: Mutex<ProcessMap>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, process_id: &ProcessId) -> Option<Arc<ProcessHandle>> {
        self.processes.lock().await.get(process_id).cloned()
    }

    /// Handles of all tracked processes, ordered by id.
    pub async fn handles(&self) -> Vec<Arc<ProcessHandle>> {
        let processes = self.processes.lock().await;
        let mut handles: Vec<_> = processes.values().cloned().collect();
        handles.sort_by(|a, b| a.id().cmp(b.id()));
        handles
    }

    /// Exclusive access for compound operations such as check-then-insert.
    pub async fn lock(&self) -> MutexGuard<'_, ProcessMap> {
        self.processes.lock().await
    }
}
