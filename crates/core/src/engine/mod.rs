//! Stage execution engine.
//!
//! The `StageRunner` executes one stage of a research process at a time,
//! surfacing progress on the update bus. Every failure is converted into a
//! [`StageOutcome`] so the driver sequences stages without error plumbing.

pub mod context;
mod stages;

pub use context::StageContext;

use crate::aggregate::AnalysisAggregator;
use crate::analysis::base::AnalysisClient;
use crate::analysis::retry::RetryPolicy;
use crate::collect::Collector;
use rp_protocol::{PipelineSettings, StageName};
use std::sync::Arc;
use tracing::debug;

/// How a single stage run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage finished and its output is stored on the process.
    Completed,

    /// A pause was observed at a checkpoint; the stage can be re-entered.
    Suspended,

    /// A stop was observed at a checkpoint.
    Stopped,

    /// Stage-level fatal error; the process must not proceed.
    Failed { message: String },
}

impl StageOutcome {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Executes the four research stages.
///
/// The runner is shared by every process of an orchestrator and keeps no
/// per-process state; all accumulated data lives in the [`StageContext`].
pub struct StageRunner {
    collector: Arc<dyn Collector>,
    client: Arc<dyn AnalysisClient>,
    aggregator: AnalysisAggregator,
    retry: RetryPolicy,
}

impl StageRunner {
    /// Create a runner with default retry and aggregation settings.
    ///
    /// # Arguments
    ///
    /// * `collector` - Source of raw research items
    /// * `client` - The external analysis capability
    pub fn new(collector: Arc<dyn Collector>, client: Arc<dyn AnalysisClient>) -> Self {
        Self {
            collector,
            client,
            aggregator: AnalysisAggregator::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_settings(
        collector: Arc<dyn Collector>,
        client: Arc<dyn AnalysisClient>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            collector,
            client,
            aggregator: AnalysisAggregator::new(settings.aggregation.clone()),
            retry: RetryPolicy::from_settings(&settings.retry),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_aggregator(mut self, aggregator: AnalysisAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Execute one stage against the process behind `ctx`.
    pub async fn run(&self, stage: StageName, ctx: &StageContext) -> StageOutcome {
        debug!(process_id = %ctx.process_id(), %stage, "running stage");

        match stage {
            StageName::Collection => self.collect(ctx).await,
            StageName::Validation => self.validate(ctx).await,
            StageName::Analysis => self.analyze(ctx).await,
            StageName::Report => self.report(ctx).await,
        }
    }
}
