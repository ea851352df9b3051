//! Process state machine implementation.
//!
//! This module provides functions for managing the lifecycle of a
//! `ProcessState`, including stage and status transitions and the events
//! each transition emits. Callers hold the process lock, so events of one
//! process are published in the order its transitions happen.

use crate::bus::UpdateBus;
use crate::telemetry;
use chrono::Utc;
use rp_protocol::{
    Event, LiveLogLine, LogSeverity, ProcessFailure, ProcessState, ProcessStatus, ProcessUpdate,
    StageName, StageStatus, StageUpdate,
};

fn publish_stage(state: &ProcessState, bus: &UpdateBus, stage: StageName) {
    if let Some(s) = state.stage(stage) {
        bus.publish(Event::StageUpdate(StageUpdate {
            process_id: state.id.clone(),
            stage_name: s.name,
            status: s.status,
            progress: s.progress,
            detail: s.detail.clone(),
        }));
    }
}

fn publish_status(state: &ProcessState, bus: &UpdateBus) {
    bus.publish(Event::ProcessUpdate(ProcessUpdate {
        process_id: state.id.clone(),
        status: state.status,
        stage_index: state.current_stage,
        failure: state.failure.clone(),
    }));
}

/// Emit a live log line for the process.
///
/// # Arguments
///
/// * `state` - The process the line belongs to
/// * `bus` - Bus to publish the line on
/// * `severity` - Severity shown to subscribers
/// * `message` - The log message
pub fn log_to_process(
    state: &ProcessState,
    bus: &UpdateBus,
    severity: LogSeverity,
    message: impl Into<String>,
) {
    bus.publish(Event::LiveLog(LiveLogLine {
        process_id: state.id.clone(),
        timestamp: Utc::now(),
        message: message.into(),
        severity,
    }));
}

/// Announce a freshly created, running process.
pub fn start_process(state: &mut ProcessState, bus: &UpdateBus) {
    state.status = ProcessStatus::Running;
    telemetry::process_started();
    publish_status(state, bus);
    log_to_process(
        state,
        bus,
        LogSeverity::Info,
        format!("Research process started for topic: {}", state.request.topic),
    );
}

/// Set the stage at `current_stage` running and emit its update.
///
/// Returns `None` once every stage has been passed.
pub fn begin_stage(state: &mut ProcessState, bus: &UpdateBus) -> Option<StageName> {
    let index = state.current_stage;
    let stage = state.stages.get_mut(index)?;
    stage.status = StageStatus::Running;
    if stage.detail.is_empty() {
        stage.detail = format!("{} started", stage.name.label());
    }
    let name = stage.name;

    publish_stage(state, bus, name);
    Some(name)
}

/// Raise a stage's progress and overwrite its detail.
///
/// Progress never decreases: a lower value than the current one (e.g. a
/// restarted stage) keeps the current value.
pub fn set_stage_progress(
    state: &mut ProcessState,
    bus: &UpdateBus,
    stage: StageName,
    progress: u8,
    detail: impl Into<String>,
) {
    if let Some(s) = state.stage_mut(stage) {
        s.progress = s.progress.max(progress.min(100));
        s.detail = detail.into();
        publish_stage(state, bus, stage);
    }
}

/// Mark `stage` completed and move on to the next one.
pub fn complete_stage(state: &mut ProcessState, bus: &UpdateBus, stage: StageName) {
    if let Some(s) = state.stage_mut(stage) {
        s.status = StageStatus::Completed;
        s.progress = 100;
    }
    publish_stage(state, bus, stage);
    state.current_stage += 1;
}

/// Freeze the stage at `current_stage` if its status is one of `from`.
fn suspend_stage(state: &mut ProcessState, bus: &UpdateBus, from: &[StageStatus]) {
    let index = state.current_stage;
    if let Some(stage) = state.stages.get_mut(index) {
        if from.contains(&stage.status) {
            stage.status = StageStatus::Suspended;
            let name = stage.name;
            publish_stage(state, bus, name);
        }
    }
}

/// Mark the stage a paused process will pick up at as suspended.
///
/// Covers both the in-flight stage and, at a stage boundary, the pending
/// next one, so a paused process always has exactly one suspended stage.
pub fn suspend_current_stage(state: &mut ProcessState, bus: &UpdateBus) {
    suspend_stage(state, bus, &[StageStatus::Running, StageStatus::Pending]);
}

/// Turn a suspended in-flight stage back into a running one.
pub fn reactivate_stage(state: &mut ProcessState, bus: &UpdateBus) {
    let index = state.current_stage;
    if let Some(stage) = state.stages.get_mut(index) {
        if stage.status == StageStatus::Suspended {
            stage.status = StageStatus::Running;
            let name = stage.name;
            publish_stage(state, bus, name);
        }
    }
}

/// Transition to Paused status and emit event.
///
/// The stage to continue with becomes `suspended`.
pub fn pause_process(state: &mut ProcessState, bus: &UpdateBus) {
    state.status = ProcessStatus::Paused;
    suspend_current_stage(state, bus);
    log_to_process(state, bus, LogSeverity::Info, "Research process paused");
    publish_status(state, bus);
}

/// Resume from Paused status to Running and emit event.
pub fn resume_process(state: &mut ProcessState, bus: &UpdateBus) {
    state.status = ProcessStatus::Running;
    log_to_process(state, bus, LogSeverity::Info, "Research process resumed");
    publish_status(state, bus);
}

/// Transition to Stopped status and emit event.
pub fn stop_process(state: &mut ProcessState, bus: &UpdateBus) {
    state.status = ProcessStatus::Stopped;
    state.finished_at = Some(Utc::now());
    telemetry::process_finished(state.status);
    suspend_stage(state, bus, &[StageStatus::Running]);
    log_to_process(state, bus, LogSeverity::Warning, "Research process stopped");
    publish_status(state, bus);
}

/// Mark the process as completed and emit event.
pub fn complete_process(state: &mut ProcessState, bus: &UpdateBus) {
    state.status = ProcessStatus::Completed;
    state.finished_at = Some(Utc::now());
    telemetry::process_finished(state.status);
    log_to_process(state, bus, LogSeverity::Info, "Research process completed");
    publish_status(state, bus);
}

/// Mark `stage` and the whole process as failed and emit events.
///
/// # Arguments
///
/// * `state` - The process to fail
/// * `bus` - Bus to publish the updates on
/// * `stage` - The stage that hit the fatal error
/// * `message` - Diagnostic describing the failure
pub fn fail_process(state: &mut ProcessState, bus: &UpdateBus, stage: StageName, message: String) {
    if let Some(s) = state.stage_mut(stage) {
        s.status = StageStatus::Error;
        s.detail = message.clone();
    }
    publish_stage(state, bus, stage);

    state.status = ProcessStatus::Error;
    state.finished_at = Some(Utc::now());
    telemetry::process_finished(state.status);
    state.failure = Some(ProcessFailure {
        stage,
        message: message.clone(),
    });
    log_to_process(
        state,
        bus,
        LogSeverity::Error,
        format!("{} failed: {message}", stage.label()),
    );
    publish_status(state, bus);
}
