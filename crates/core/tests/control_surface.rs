//! Integration tests for the op dispatch, configuration-driven runs and
//! bus subscribers attached to live processes.

mod common;

use common::*;
use rp_core::analysis::adapters::{ScriptedClient, SimulatedClient};
use rp_core::collect::FocusAreaCollector;
use rp_core::config::{load_config, TemplateOverrides};
use rp_core::ProcessOrchestrator;
use rp_protocol::{Event, LogSeverity, Op, OpReply, ProcessId, ProcessStatus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_op_dispatch() {
    let orchestrator = orchestrator_with(
        research_items(&["a", "b"]),
        Arc::new(ScriptedClient::succeeding()),
    );

    let reply = orchestrator
        .handle(Op::StartProcess {
            process_id: None,
            request: request(),
        })
        .await
        .unwrap();
    let process_id = match reply {
        OpReply::Started { process_id } => process_id,
        other => panic!("unexpected reply: {other:?}"),
    };

    wait_until_finished(&orchestrator, &process_id).await;

    match orchestrator
        .handle(Op::GetProcessState {
            process_id: process_id.clone(),
        })
        .await
        .unwrap()
    {
        OpReply::State(state) => assert_eq!(state.status, ProcessStatus::Completed),
        other => panic!("unexpected reply: {other:?}"),
    }

    match orchestrator.handle(Op::ListProcesses).await.unwrap() {
        OpReply::Processes(states) => assert_eq!(states.len(), 1),
        other => panic!("unexpected reply: {other:?}"),
    }

    let reply = orchestrator
        .handle(Op::StopProcess {
            process_id: process_id.clone(),
        })
        .await
        .unwrap();
    assert!(matches!(reply, OpReply::Accepted { .. }));

    let missing = orchestrator
        .handle(Op::PauseProcess {
            process_id: ProcessId::from("missing"),
        })
        .await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn test_template_driven_run() {
    let project = create_test_project().expect("Failed to create test project");
    let config = load_config(project.path()).await.expect("Should load config");

    let template = config.template("market-scan").expect("template present");
    let request = template.to_request(&TemplateOverrides::default());
    assert_eq!(request.focus_areas.len(), 3);

    let orchestrator = ProcessOrchestrator::from_settings(
        Arc::new(FocusAreaCollector),
        Arc::new(SimulatedClient::new(Duration::ZERO)),
        &config.settings,
    );
    let id = orchestrator.start_new(request).await.unwrap();
    let state = wait_until_finished(&orchestrator, &id).await;

    assert_eq!(state.status, ProcessStatus::Completed);
    assert_eq!(state.collected_items.len(), 3);
    assert!(state
        .collected_items
        .iter()
        .all(|item| item.content.ends_with("Who are the key players?")
            && item.metadata.contains_key("word_count")));

    let aggregated = state.aggregated_result.unwrap();
    assert!(aggregated.top_insights.len() <= 3);
    let report = state.report.unwrap();
    assert_eq!(report.topic, "edge AI accelerators");
    assert_eq!(report.summary, aggregated.narrative_summary);
}

#[tokio::test]
async fn test_failing_subscriber_does_not_stall_process() {
    let orchestrator = orchestrator_with(
        research_items(&["a", "b", "c"]),
        Arc::new(ScriptedClient::succeeding()),
    );
    let seen = Arc::new(AtomicUsize::new(0));

    let _failing = orchestrator
        .bus()
        .subscribe_with(|_event| Err::<(), _>("subscriber is broken"));
    let _counting = {
        let seen = Arc::clone(&seen);
        orchestrator.bus().subscribe_with(move |event| {
            if matches!(event, Event::StageUpdate(_)) {
                seen.fetch_add(1, Ordering::SeqCst);
            }
            Ok::<(), String>(())
        })
    };

    let id = orchestrator.start_new(request()).await.unwrap();
    let state = wait_until_finished(&orchestrator, &id).await;

    assert_eq!(state.status, ProcessStatus::Completed);
    tokio::time::timeout(TEST_TIMEOUT, async {
        while seen.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("healthy subscriber should receive stage updates");
}

#[tokio::test]
async fn test_process_stream_carries_live_logs() {
    let client = ScriptedClient::succeeding()
        .fail_always("b", rp_core::analysis::base::AnalysisError::Unauthorized("key".into()));
    let orchestrator = orchestrator_with(research_items(&["a", "b"]), Arc::new(client));
    let id = ProcessId::from("logged");
    let other = ProcessId::from("other");
    let events = orchestrator.bus().subscribe_process(id.clone());

    orchestrator.start(id.clone(), request()).await.unwrap();
    orchestrator.start(other.clone(), request()).await.unwrap();
    let events = collect_events(events).await;

    assert!(events.iter().all(|e| e.process_id() == &id));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::LiveLog(line) if line.severity == LogSeverity::Warning && line.message.contains("item b")
    )));
    assert_event_sequence(&events);
}
