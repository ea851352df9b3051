//! Custom assertion and wait helpers for integration tests.

use rp_core::ProcessOrchestrator;
use rp_protocol::{Event, ProcessId, ProcessState, StageName, StageStatus};
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::{Stream, StreamExt};

/// Upper bound for any wait in the integration tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll the process state until `predicate` holds.
pub async fn wait_for_state<F>(
    orchestrator: &ProcessOrchestrator,
    process_id: &ProcessId,
    predicate: F,
) -> ProcessState
where
    F: Fn(&ProcessState) -> bool,
{
    tokio::time::timeout(TEST_TIMEOUT, async {
        loop {
            let state = orchestrator
                .get_state(process_id)
                .await
                .expect("process should be tracked");
            if predicate(&state) {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for process state")
}

/// Wait for a terminal status.
pub async fn wait_until_finished(
    orchestrator: &ProcessOrchestrator,
    process_id: &ProcessId,
) -> ProcessState {
    tokio::time::timeout(TEST_TIMEOUT, orchestrator.wait_until_finished(process_id))
        .await
        .expect("timed out waiting for process to finish")
        .expect("process should be tracked")
}

/// Drain a per-process stream, which ends at the terminal status update.
pub async fn collect_events(stream: Pin<Box<dyn Stream<Item = Event> + Send>>) -> Vec<Event> {
    tokio::time::timeout(TEST_TIMEOUT, stream.collect::<Vec<_>>())
        .await
        .expect("timed out collecting events")
}

/// At most one stage is running, and every stage before it is completed.
pub fn assert_stage_invariant(state: &ProcessState) {
    let running: Vec<usize> = state
        .stages
        .iter()
        .enumerate()
        .filter(|(_, s)| s.status == StageStatus::Running)
        .map(|(i, _)| i)
        .collect();
    assert!(running.len() <= 1, "more than one running stage: {:?}", state.stages);

    if let Some(&index) = running.first() {
        assert!(
            state.stages[..index]
                .iter()
                .all(|s| s.status == StageStatus::Completed),
            "stage {index} running before earlier stages completed: {:?}",
            state.stages
        );
    }
}

/// A paused process shows exactly one suspended stage: the one it resumes at.
pub fn assert_paused_at_one_stage(state: &ProcessState) {
    let suspended: Vec<usize> = state
        .stages
        .iter()
        .enumerate()
        .filter(|(_, s)| s.status == StageStatus::Suspended)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(
        suspended,
        vec![state.current_stage],
        "paused process must have exactly one suspended stage: {:?}",
        state.stages
    );
}

/// Check stage ordering and per-stage progress monotonicity of an event log.
///
/// A stage's first `running` update must come after the previous stage's
/// `completed` update, and progress never goes down within a stage.
pub fn assert_event_sequence(events: &[Event]) {
    let mut completed: Vec<StageName> = Vec::new();
    let mut last_progress: HashMap<StageName, u8> = HashMap::new();

    for event in events {
        let Event::StageUpdate(update) = event else {
            continue;
        };

        let previous = last_progress.entry(update.stage_name).or_insert(0);
        assert!(
            update.progress >= *previous,
            "progress of {} went from {} to {}",
            update.stage_name,
            previous,
            update.progress
        );
        *previous = update.progress;

        let index = StageName::ALL
            .iter()
            .position(|s| *s == update.stage_name)
            .expect("known stage");
        if update.status == StageStatus::Running && index > 0 {
            assert!(
                completed.contains(&StageName::ALL[index - 1]),
                "{} started before {} completed",
                update.stage_name,
                StageName::ALL[index - 1]
            );
        }
        if update.status == StageStatus::Completed {
            completed.push(update.stage_name);
        }
    }
}

/// Whether `stage` was ever reported as running.
pub fn stage_ever_ran(events: &[Event], stage: StageName) -> bool {
    events.iter().any(|e| {
        matches!(e, Event::StageUpdate(update)
            if update.stage_name == stage && update.status == StageStatus::Running)
    })
}
