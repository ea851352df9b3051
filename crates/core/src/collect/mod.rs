//! Data collection sources.
//!
//! A `Collector` turns a [`ResearchRequest`] into the raw items the rest
//! of the pipeline validates and analyzes.

use async_trait::async_trait;
use rp_protocol::{ResearchItem, ResearchRequest};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectError {
    #[error("Collection source unavailable: {0}")]
    Unavailable(String),
    #[error("Collection failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(&self, request: &ResearchRequest) -> Result<Vec<ResearchItem>, CollectError>;
}

/// Returns the same items for every request.
pub struct StaticCollector {
    items: Vec<ResearchItem>,
}

impl StaticCollector {
    pub fn new(items: Vec<ResearchItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl Collector for StaticCollector {
    async fn collect(&self, _request: &ResearchRequest) -> Result<Vec<ResearchItem>, CollectError> {
        Ok(self.items.clone())
    }
}

/// One item per focus area of the request; a single overview item when the
/// request has no focus areas.
#[derive(Default)]
pub struct FocusAreaCollector;

#[async_trait]
impl Collector for FocusAreaCollector {
    async fn collect(&self, request: &ResearchRequest) -> Result<Vec<ResearchItem>, CollectError> {
        if request.topic.trim().is_empty() {
            return Err(CollectError::Failed("research topic is empty".to_string()));
        }

        let areas: Vec<&str> = if request.focus_areas.is_empty() {
            vec!["general overview"]
        } else {
            request.focus_areas.iter().map(String::as_str).collect()
        };

        Ok(areas
            .into_iter()
            .enumerate()
            .map(|(index, area)| {
                let mut content = format!("{} research on {}", area, request.topic);
                for prompt in &request.prompts {
                    content.push_str(". ");
                    content.push_str(prompt);
                }
                ResearchItem::new(format!("item-{}", index + 1), area, content)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_collector() {
        let items = vec![ResearchItem::new("a", "s", "c")];
        let collector = StaticCollector::new(items.clone());
        let collected = collector.collect(&ResearchRequest::new("t")).await.unwrap();
        assert_eq!(collected, items);
    }

    #[tokio::test]
    async fn test_focus_area_collector_one_item_per_area() {
        let request = ResearchRequest::new("robotics").with_focus_areas(["market", "regulation"]);
        let items = FocusAreaCollector.collect(&request).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "item-1");
        assert_eq!(items[0].source, "market");
        assert_eq!(items[1].content, "regulation research on robotics");
    }

    #[tokio::test]
    async fn test_focus_area_collector_defaults_to_overview() {
        let items = FocusAreaCollector
            .collect(&ResearchRequest::new("robotics"))
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, "general overview");
    }

    #[tokio::test]
    async fn test_focus_area_collector_appends_prompts() {
        let mut request = ResearchRequest::new("robotics");
        request.prompts.push("Key players".to_string());
        let items = FocusAreaCollector.collect(&request).await.unwrap();

        assert!(items[0].content.ends_with(". Key players"));
    }

    #[tokio::test]
    async fn test_focus_area_collector_rejects_empty_topic() {
        let result = FocusAreaCollector.collect(&ResearchRequest::new("  ")).await;
        assert!(matches!(result, Err(CollectError::Failed(_))));
    }
}
