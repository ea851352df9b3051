//! Process orchestrator coordinating all research processes.
//!
//! The `ProcessOrchestrator` is the control surface of the pipeline. It
//! keeps the registry of tracked processes, spawns one driver task per
//! running process and serves start, pause, resume, stop and state
//! queries. Control calls for different processes run concurrently; calls
//! for the same process are serialized by that process's handle lock.

use crate::analysis::base::AnalysisClient;
use crate::bus::UpdateBus;
use crate::collect::Collector;
use crate::engine::{StageContext, StageOutcome, StageRunner};
use crate::state::error::{OrchestratorError, OrchestratorResult};
use crate::state::handle::{ProcessHandle, ProcessInner, Signal};
use crate::state::process::{
    begin_stage, complete_process, complete_stage, fail_process, pause_process,
    reactivate_stage, resume_process, start_process, stop_process, suspend_current_stage,
};
use crate::state::registry::ProcessRegistry;
use crate::telemetry;
use chrono::{DateTime, Utc};
use rp_protocol::{
    Op, OpReply, PipelineSettings, ProcessId, ProcessState, ProcessStatus, ResearchRequest,
    StageName,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Fallback poll interval of [`ProcessOrchestrator::wait_until_finished`].
const FINISH_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Owns every tracked process and drives its stage sequence.
pub struct ProcessOrchestrator {
    registry: ProcessRegistry,
    runner: Arc<StageRunner>,
    bus: UpdateBus,

    /// How long terminal processes stay queryable.
    retention: Duration,
}

impl ProcessOrchestrator {
    /// Create an orchestrator around a stage runner and an update bus.
    ///
    /// # Arguments
    ///
    /// * `runner` - Executes the individual stages
    /// * `bus` - Receives every stage, status and log update
    pub fn new(runner: StageRunner, bus: UpdateBus) -> Self {
        let retention = PipelineSettings::default().retention.finished_retention_secs;
        Self {
            registry: ProcessRegistry::new(),
            runner: Arc::new(runner),
            bus,
            retention: Duration::from_secs(retention),
        }
    }

    /// Build the runner, the bus and the retention window from settings.
    pub fn from_settings(
        collector: Arc<dyn Collector>,
        client: Arc<dyn AnalysisClient>,
        settings: &PipelineSettings,
    ) -> Self {
        let runner = StageRunner::from_settings(collector, client, settings);
        Self::new(runner, UpdateBus::from_settings(&settings.bus)).with_retention(
            Duration::from_secs(settings.retention.finished_retention_secs),
        )
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn bus(&self) -> &UpdateBus {
        &self.bus
    }

    /// Start a process in the background.
    ///
    /// Returns as soon as the process is registered; stages run on a
    /// spawned task. A terminal process with the same id is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::AlreadyRunning`] if `process_id` is
    /// tracked and not terminal.
    pub async fn start(
        &self,
        process_id: ProcessId,
        request: ResearchRequest,
    ) -> OrchestratorResult<()> {
        self.prune_finished().await;

        let handle = {
            let mut processes = self.registry.lock().await;
            if let Some(existing) = processes.get(&process_id) {
                if !existing.lock().await.state.status.is_terminal() {
                    return Err(OrchestratorError::AlreadyRunning(process_id));
                }
            }

            let handle = Arc::new(ProcessHandle::new(process_id.clone(), request));
            start_process(&mut handle.lock().await.state, &self.bus);
            processes.insert(process_id.clone(), Arc::clone(&handle));
            handle
        };

        info!(process_id = %process_id, "process started");
        self.spawn_driver(handle);
        Ok(())
    }

    /// Start a process under a freshly generated id.
    pub async fn start_new(&self, request: ResearchRequest) -> OrchestratorResult<ProcessId> {
        let process_id = ProcessId::generate();
        self.start(process_id.clone(), request).await?;
        Ok(process_id)
    }

    /// Pause a running process.
    ///
    /// The process becomes `paused` immediately; its in-flight stage stops
    /// at the next checkpoint (the next item for analysis, the end of the
    /// stage otherwise).
    ///
    /// # Errors
    ///
    /// Returns an error if the process is not found or not running.
    pub async fn pause(&self, process_id: &ProcessId) -> OrchestratorResult<()> {
        let handle = self.lookup(process_id).await?;
        let mut inner = handle.lock().await;

        if inner.state.status != ProcessStatus::Running {
            return Err(invalid_state(process_id, inner.state.status, "pause"));
        }

        inner.signal = Signal::Pause;
        pause_process(&mut inner.state, &self.bus);
        info!(process_id = %process_id, stage = inner.state.current_stage, "process paused");
        Ok(())
    }

    /// Resume a paused process from its checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the process is not found or not paused.
    pub async fn resume(&self, process_id: &ProcessId) -> OrchestratorResult<()> {
        let handle = self.lookup(process_id).await?;
        let mut inner = handle.lock().await;

        if inner.state.status != ProcessStatus::Paused {
            return Err(invalid_state(process_id, inner.state.status, "resume"));
        }

        inner.signal = Signal::Run;
        resume_process(&mut inner.state, &self.bus);
        info!(process_id = %process_id, stage = inner.state.current_stage, "process resumed");

        if inner.driver_active {
            // The driver has not reached its checkpoint yet and keeps going.
            reactivate_stage(&mut inner.state, &self.bus);
        } else {
            inner.driver_active = true;
            drop(inner);
            self.spawn_driver(Arc::clone(&handle));
        }
        Ok(())
    }

    /// Stop a process.
    ///
    /// Stopping an already terminal process is a no-op. Otherwise the
    /// process becomes `stopped` at once; work in flight finishes its
    /// current item and pending retry backoffs are cut short.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for an unknown id.
    pub async fn stop(&self, process_id: &ProcessId) -> OrchestratorResult<()> {
        let handle = self.lookup(process_id).await?;
        let mut inner = handle.lock().await;

        if inner.state.status.is_terminal() {
            debug!(process_id = %process_id, status = ?inner.state.status, "stop on finished process ignored");
            return Ok(());
        }

        inner.signal = Signal::Stop;
        stop_process(&mut inner.state, &self.bus);
        handle.cancel_token().cancel();
        info!(process_id = %process_id, "process stopped");
        Ok(())
    }

    /// Snapshot of a process's state.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for an unknown id.
    pub async fn get_state(&self, process_id: &ProcessId) -> OrchestratorResult<ProcessState> {
        Ok(self.lookup(process_id).await?.snapshot().await)
    }

    /// Snapshots of all tracked processes.
    pub async fn list(&self) -> Vec<ProcessState> {
        let mut states = Vec::new();
        for handle in self.registry.handles().await {
            states.push(handle.snapshot().await);
        }
        states
    }

    /// Dispatch a control operation.
    pub async fn handle(&self, op: Op) -> OrchestratorResult<OpReply> {
        match op {
            Op::StartProcess {
                process_id: Some(process_id),
                request,
            } => {
                self.start(process_id.clone(), request).await?;
                Ok(OpReply::Started { process_id })
            }
            Op::StartProcess {
                process_id: None,
                request,
            } => {
                let process_id = self.start_new(request).await?;
                Ok(OpReply::Started { process_id })
            }
            Op::PauseProcess { process_id } => {
                self.pause(&process_id).await?;
                Ok(OpReply::Accepted { process_id })
            }
            Op::ResumeProcess { process_id } => {
                self.resume(&process_id).await?;
                Ok(OpReply::Accepted { process_id })
            }
            Op::StopProcess { process_id } => {
                self.stop(&process_id).await?;
                Ok(OpReply::Accepted { process_id })
            }
            Op::GetProcessState { process_id } => {
                let state = self.get_state(&process_id).await?;
                Ok(OpReply::State(Box::new(state)))
            }
            Op::ListProcesses => Ok(OpReply::Processes(self.list().await)),
        }
    }

    /// Wait until a process reaches a terminal status and return its state.
    ///
    /// A paused process keeps this waiting until it is resumed or stopped.
    pub async fn wait_until_finished(&self, process_id: &ProcessId) -> OrchestratorResult<ProcessState> {
        let mut updates = self.bus.subscribe_process(process_id.clone());

        loop {
            let state = self.get_state(process_id).await?;
            if state.status.is_terminal() {
                return Ok(state);
            }

            tokio::select! {
                event = updates.next() => {
                    if event.is_none() {
                        return self.get_state(process_id).await;
                    }
                }
                _ = tokio::time::sleep(FINISH_POLL_INTERVAL) => {}
            }
        }
    }

    /// Forget terminal processes older than the retention window.
    ///
    /// Returns the number of processes removed.
    pub async fn prune_finished(&self) -> usize {
        let now = Utc::now();
        let mut processes = self.registry.lock().await;

        let mut expired = Vec::new();
        for (process_id, handle) in processes.iter() {
            let inner = handle.lock().await;
            if is_expired(&inner.state, now, self.retention) {
                expired.push(process_id.clone());
            }
        }

        for process_id in &expired {
            processes.remove(process_id);
            debug!(process_id = %process_id, "finished process pruned");
        }
        expired.len()
    }

    async fn lookup(&self, process_id: &ProcessId) -> OrchestratorResult<Arc<ProcessHandle>> {
        self.registry
            .get(process_id)
            .await
            .ok_or_else(|| OrchestratorError::NotFound(process_id.clone()))
    }

    fn spawn_driver(&self, handle: Arc<ProcessHandle>) {
        let runner = Arc::clone(&self.runner);
        let bus = self.bus.clone();
        tokio::spawn(drive(handle, runner, bus));
    }
}

fn invalid_state(
    process_id: &ProcessId,
    status: ProcessStatus,
    operation: &'static str,
) -> OrchestratorError {
    OrchestratorError::InvalidState {
        process_id: process_id.clone(),
        status,
        operation,
    }
}

fn is_expired(state: &ProcessState, now: DateTime<Utc>, retention: Duration) -> bool {
    if !state.status.is_terminal() {
        return false;
    }
    state
        .finished_at
        .and_then(|finished| (now - finished).to_std().ok())
        .is_some_and(|age| age >= retention)
}

/// Run the stage sequence of one process from its current stage.
///
/// The driver parks (exits) when it observes a pause or stop at a stage
/// boundary; `resume` spawns a new one. It never overwrites a terminal
/// status set by a control call.
async fn drive(handle: Arc<ProcessHandle>, runner: Arc<StageRunner>, bus: UpdateBus) {
    let ctx = StageContext::new(Arc::clone(&handle), bus.clone());

    loop {
        let stage = {
            let mut inner = handle.lock().await;
            if inner.signal != Signal::Run || inner.state.status.is_terminal() {
                inner.driver_active = false;
                debug!(process_id = %handle.id(), signal = ?inner.signal, "driver parked");
                return;
            }

            match begin_stage(&mut inner.state, &bus) {
                Some(stage) => stage,
                None => {
                    complete_process(&mut inner.state, &bus);
                    inner.driver_active = false;
                    info!(process_id = %handle.id(), "process completed");
                    return;
                }
            }
        };

        let started = Instant::now();
        let outcome = runner.run(stage, &ctx).await;
        telemetry::stage_finished(stage, &outcome, started.elapsed());

        let mut inner = handle.lock().await;
        if !record_stage_outcome(&mut inner, &bus, stage, outcome) {
            inner.driver_active = false;
            return;
        }
    }
}

/// Apply the outcome of one stage run to its process.
///
/// Returns whether the driver loops on. Completing the last stage
/// completes the process under the same lock, even when a pause arrived
/// while that stage ran.
fn record_stage_outcome(
    inner: &mut ProcessInner,
    bus: &UpdateBus,
    stage: StageName,
    outcome: StageOutcome,
) -> bool {
    if inner.state.status.is_terminal() {
        return false;
    }

    match outcome {
        StageOutcome::Completed => {
            complete_stage(&mut inner.state, bus, stage);
            debug!(process_id = %inner.state.id, %stage, "stage completed");

            if inner.state.current_stage >= inner.state.stages.len() {
                complete_process(&mut inner.state, bus);
                info!(process_id = %inner.state.id, "process completed");
                return false;
            }
            if inner.signal == Signal::Pause {
                suspend_current_stage(&mut inner.state, bus);
            }
            true
        }
        // Loops back: parks unless the process was resumed meanwhile.
        StageOutcome::Suspended => true,
        StageOutcome::Stopped => false,
        StageOutcome::Failed { message } => {
            warn!(process_id = %inner.state.id, %stage, error = %message, "stage failed");
            fail_process(&mut inner.state, bus, stage, message);
            false
        }
    }
}
