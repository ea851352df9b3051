//! Primary/fallback chaining of analysis clients.
//!
//! The `FallbackClient` routes each call to a primary provider and falls
//! back to a secondary provider when the primary is unavailable or fails.

use crate::analysis::base::{AnalysisClient, AnalysisError, ItemAnalysis};
use async_trait::async_trait;
use rp_protocol::ResearchItem;
use std::sync::Arc;
use tracing::{debug, warn};

/// Chains two analysis clients.
///
/// One call through the chain counts as a single attempt of the retry
/// loop: the fallback is tried at most once per call, and its error (with
/// its own transient/permanent classification) is what the caller sees.
pub struct FallbackClient {
    name: String,
    primary: Arc<dyn AnalysisClient>,
    fallback: Arc<dyn AnalysisClient>,
}

impl FallbackClient {
    pub fn new(primary: Arc<dyn AnalysisClient>, fallback: Arc<dyn AnalysisClient>) -> Self {
        let name = format!("{}+{}", primary.name(), fallback.name());
        Self {
            name,
            primary,
            fallback,
        }
    }
}

#[async_trait]
impl AnalysisClient for FallbackClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_availability(&self) -> bool {
        self.primary.check_availability().await || self.fallback.check_availability().await
    }

    async fn analyze(&self, item: &ResearchItem) -> Result<ItemAnalysis, AnalysisError> {
        if self.primary.check_availability().await {
            match self.primary.analyze(item).await {
                Ok(analysis) => return Ok(analysis),
                Err(e) => {
                    warn!(
                        item_id = %item.id,
                        primary = self.primary.name(),
                        fallback = self.fallback.name(),
                        error = %e,
                        "primary analysis failed, trying fallback"
                    );
                }
            }
        } else {
            debug!(primary = self.primary.name(), "primary unavailable, using fallback");
        }

        if !self.fallback.check_availability().await {
            return Err(AnalysisError::Rejected(format!(
                "No analysis provider available for item {}",
                item.id
            )));
        }
        self.fallback.analyze(item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::adapters::ScriptedClient;

    fn item(id: &str) -> ResearchItem {
        ResearchItem::new(id, "test", "content")
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = Arc::new(ScriptedClient::succeeding().named("primary"));
        let fallback = Arc::new(ScriptedClient::succeeding().named("fallback"));
        let chain = FallbackClient::new(primary.clone(), fallback.clone());

        assert!(chain.analyze(&item("a")).await.is_ok());
        assert_eq!(primary.calls_for("a"), 1);
        assert_eq!(fallback.calls_for("a"), 0);
        assert_eq!(chain.name(), "primary+fallback");
    }

    #[tokio::test]
    async fn test_primary_failure_uses_fallback() {
        let primary = Arc::new(
            ScriptedClient::succeeding().fail_always("a", AnalysisError::Unauthorized("key".into())),
        );
        let fallback = Arc::new(ScriptedClient::succeeding());
        let chain = FallbackClient::new(primary.clone(), fallback.clone());

        assert!(chain.analyze(&item("a")).await.is_ok());
        assert_eq!(primary.calls_for("a"), 1);
        assert_eq!(fallback.calls_for("a"), 1);
    }

    #[tokio::test]
    async fn test_unavailable_primary_is_skipped() {
        let primary = Arc::new(ScriptedClient::unavailable());
        let fallback = Arc::new(ScriptedClient::succeeding());
        let chain = FallbackClient::new(primary.clone(), fallback.clone());

        assert!(chain.check_availability().await);
        assert!(chain.analyze(&item("a")).await.is_ok());
        assert_eq!(primary.calls_for("a"), 0);
    }

    #[tokio::test]
    async fn test_fallback_error_is_returned() {
        let primary = Arc::new(
            ScriptedClient::succeeding().fail_always("a", AnalysisError::Timeout("t".into())),
        );
        let fallback = Arc::new(
            ScriptedClient::succeeding().fail_always("a", AnalysisError::InvalidInput("i".into())),
        );
        let chain = FallbackClient::new(primary, fallback);

        let err = chain.analyze(&item("a")).await.unwrap_err();
        assert_eq!(err, AnalysisError::InvalidInput("i".into()));
    }

    #[tokio::test]
    async fn test_no_provider_available() {
        let chain = FallbackClient::new(
            Arc::new(ScriptedClient::unavailable()),
            Arc::new(ScriptedClient::unavailable()),
        );

        assert!(!chain.check_availability().await);
        assert!(matches!(
            chain.analyze(&item("a")).await,
            Err(AnalysisError::Rejected(_))
        ));
    }
}
