//! Base AnalysisClient trait and supporting types.

use async_trait::async_trait;
use rp_protocol::ResearchItem;
use thiserror::Error;

/// Structured analysis of one item as returned by the external capability.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemAnalysis {
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub risk_notes: Vec<String>,
    pub confidence: f64,
}

impl ItemAnalysis {
    pub fn new(confidence: f64) -> Self {
        Self {
            insights: Vec::new(),
            recommendations: Vec::new(),
            risk_notes: Vec::new(),
            confidence,
        }
    }

    pub fn with_insight(mut self, insight: impl Into<String>) -> Self {
        self.insights.push(insight.into());
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendations.push(recommendation.into());
        self
    }

    pub fn with_risk(mut self, risk: impl Into<String>) -> Self {
        self.risk_notes.push(risk.into());
        self
    }
}

/// Failure of a single analysis call.
///
/// The first three variants are transient and worth retrying; the rest
/// are permanent and short-circuit the retry loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl AnalysisError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::RateLimited(_) | Self::MalformedResponse(_)
        )
    }
}

/// The external analysis capability (an LLM provider, a local model, ...).
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn check_availability(&self) -> bool {
        true
    }

    async fn analyze(&self, item: &ResearchItem) -> Result<ItemAnalysis, AnalysisError>;
}
