//! The four research stages.

use super::{StageContext, StageOutcome, StageRunner};
use crate::analysis::retry::analyze_with_retry;
use crate::state::handle::Signal;
use crate::state::process::{log_to_process, set_stage_progress};
use crate::telemetry;
use chrono::Utc;
use rp_protocol::{
    AggregatedResult, LogSeverity, ProcessId, ResearchItem, ResearchReport, StageName,
};
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (done.min(total) * 100 / total) as u8
}

impl StageRunner {
    /// Fetch raw items from the collector.
    ///
    /// Not resumable: a pause observed after the fetch discards its items
    /// and the stage starts over on resume.
    pub(super) async fn collect(&self, ctx: &StageContext) -> StageOutcome {
        let stage = StageName::Collection;
        let request = ctx.request().await;
        ctx.progress(stage, 0, format!("Collecting data for {}", request.topic))
            .await;

        let collected = self.collector.collect(&request).await;

        let mut inner = ctx.lock().await;
        match inner.signal {
            Signal::Stop => return StageOutcome::Stopped,
            Signal::Pause => {
                log_to_process(
                    &inner.state,
                    ctx.bus(),
                    LogSeverity::Info,
                    "Collection interrupted; it restarts when the process resumes",
                );
                return StageOutcome::Suspended;
            }
            Signal::Run => {}
        }

        let items = match collected {
            Ok(items) => items,
            Err(e) => return StageOutcome::failed(e.to_string()),
        };

        let count = items.len();
        inner.state.collected_items = items;
        set_stage_progress(
            &mut inner.state,
            ctx.bus(),
            stage,
            100,
            format!("Collected {count} item(s)"),
        );
        log_to_process(
            &inner.state,
            ctx.bus(),
            LogSeverity::Info,
            format!("Collected {count} item(s) for {}", request.topic),
        );
        StageOutcome::Completed
    }

    /// Clean up and enrich the collected items in place.
    pub(super) async fn validate(&self, ctx: &StageContext) -> StageOutcome {
        let stage = StageName::Validation;
        let mut inner = ctx.lock().await;
        if inner.state.status.is_terminal() {
            return StageOutcome::Stopped;
        }
        set_stage_progress(&mut inner.state, ctx.bus(), stage, 0, "Validating collected items");

        let topic = inner.state.request.topic.clone();
        let items = std::mem::take(&mut inner.state.collected_items);
        let (items, warnings) = validate_items(items, &topic);

        set_stage_progress(
            &mut inner.state,
            ctx.bus(),
            stage,
            50,
            format!("{} item(s) passed validation", items.len()),
        );
        for warning in warnings {
            log_to_process(&inner.state, ctx.bus(), LogSeverity::Warning, warning);
        }

        let count = items.len();
        inner.state.collected_items = items;
        set_stage_progress(
            &mut inner.state,
            ctx.bus(),
            stage,
            100,
            format!("Enriched {count} item(s)"),
        );
        StageOutcome::Completed
    }

    /// Analyze every collected item, then aggregate the outcomes.
    ///
    /// Resumes at the first item without an outcome. The control signal is
    /// checked before each item; an item already submitted always gets its
    /// outcome recorded.
    pub(super) async fn analyze(&self, ctx: &StageContext) -> StageOutcome {
        let stage = StageName::Analysis;
        let (items, start) = {
            let inner = ctx.lock().await;
            (
                inner.state.collected_items.clone(),
                inner.state.analysis_outcomes.len(),
            )
        };
        let total = items.len();

        if start > 0 {
            ctx.log(
                LogSeverity::Info,
                format!("Resuming analysis at item {} of {total}", start + 1),
            )
            .await;
        }
        ctx.progress(
            stage,
            percent(start, total),
            format!("Analyzing {total} item(s)"),
        )
        .await;

        for (index, item) in items.iter().enumerate().skip(start) {
            match ctx.checkpoint().await {
                Signal::Run => {}
                Signal::Pause => return StageOutcome::Suspended,
                Signal::Stop => return StageOutcome::Stopped,
            }

            let outcome =
                analyze_with_retry(self.client.as_ref(), item, &self.retry, ctx.cancel_token())
                    .await;

            telemetry::item_analyzed(&outcome);
            let mut inner = ctx.lock().await;
            if inner.state.status.is_terminal() {
                // Stopped while the call ran: keep the result, publish nothing.
                inner.state.analysis_outcomes.push(outcome);
                return StageOutcome::Stopped;
            }
            if outcome.is_completed() {
                info!(process_id = %ctx.process_id(), item_id = %item.id, attempts = outcome.attempts, "item analyzed");
            } else {
                let diagnostic = outcome.risk_notes.first().cloned().unwrap_or_default();
                log_to_process(
                    &inner.state,
                    ctx.bus(),
                    LogSeverity::Warning,
                    format!("Analysis of item {} failed: {diagnostic}", item.id),
                );
            }
            inner.state.analysis_outcomes.push(outcome);

            let done = index + 1;
            set_stage_progress(
                &mut inner.state,
                ctx.bus(),
                stage,
                percent(done, total),
                format!("Analyzed {done} of {total} item(s)"),
            );
        }

        let mut inner = ctx.lock().await;
        match inner.signal {
            Signal::Run => {}
            Signal::Pause => return StageOutcome::Suspended,
            Signal::Stop => return StageOutcome::Stopped,
        }

        let aggregated = self.aggregator.aggregate(&inner.state.analysis_outcomes);
        match aggregated {
            Ok(result) => {
                log_to_process(
                    &inner.state,
                    ctx.bus(),
                    LogSeverity::Info,
                    format!(
                        "Aggregated {} outcome(s), {} failed",
                        result.coverage.total_items, result.coverage.failed_items
                    ),
                );
                inner.state.aggregated_result = Some(result);
                StageOutcome::Completed
            }
            Err(e) => {
                warn!(process_id = %ctx.process_id(), error = %e, "aggregation failed");
                StageOutcome::failed(format!("Aggregation failed: {e}"))
            }
        }
    }

    /// Turn the aggregated result into the final report.
    pub(super) async fn report(&self, ctx: &StageContext) -> StageOutcome {
        let stage = StageName::Report;
        let mut inner = ctx.lock().await;
        if inner.state.status.is_terminal() {
            return StageOutcome::Stopped;
        }

        let Some(aggregated) = inner.state.aggregated_result.as_ref() else {
            return StageOutcome::failed("Cannot generate a report without an aggregated result");
        };
        let report = build_report(&inner.state.id, &inner.state.request.topic, aggregated);

        inner.state.report = Some(report);
        set_stage_progress(&mut inner.state, ctx.bus(), stage, 100, "Report ready");
        log_to_process(&inner.state, ctx.bus(), LogSeverity::Info, "Research report generated");
        StageOutcome::Completed
    }
}

/// Trim, drop empty and duplicate items, and add enrichment metadata.
///
/// Returns the surviving items and one warning per dropped item.
fn validate_items(items: Vec<ResearchItem>, topic: &str) -> (Vec<ResearchItem>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(items.len());
    let mut warnings = Vec::new();

    for mut item in items {
        let content = item.content.trim().to_string();
        if content.is_empty() {
            warnings.push(format!("Dropped item {}: empty content", item.id));
            continue;
        }
        if !seen.insert(item.id.clone()) {
            warnings.push(format!("Dropped item {}: duplicate id", item.id));
            continue;
        }

        let words = content.split_whitespace().count();
        item.content = content;
        item.metadata.insert("word_count".to_string(), words.to_string());
        item.metadata.insert("topic".to_string(), topic.to_string());
        kept.push(item);
    }

    (kept, warnings)
}

fn build_report(process_id: &ProcessId, topic: &str, aggregated: &AggregatedResult) -> ResearchReport {
    ResearchReport {
        id: Uuid::new_v4().to_string(),
        process_id: process_id.clone(),
        topic: topic.to_string(),
        generated_at: Utc::now(),
        summary: aggregated.narrative_summary.clone(),
        key_findings: aggregated.top_insights.clone(),
        recommendations: aggregated.key_recommendations.clone(),
        risks: aggregated.critical_risks.clone(),
        coverage: aggregated.coverage.clone(),
    }
}
