//! Configuration models that aggregate all settings.
//!
//! This module provides the unified `AppConfig` structure that combines the
//! pipeline settings and the research templates into a single object.

use rp_protocol::{PipelineSettings, ResearchRequest};
use serde::{Deserialize, Serialize};

/// Unified application configuration loaded from `.research-pipeline/`.
///
/// This structure aggregates all configuration sources:
/// - `config.toml`: Pipeline settings
/// - `templates/*.md`: Research templates
///
/// # Example
///
/// ```rust,no_run
/// use rp_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} templates", config.templates.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Settings from `config.toml`, defaults for anything missing.
    pub settings: PipelineSettings,

    /// Research templates loaded from `templates/*.md`, ordered by file name.
    pub templates: Vec<ResearchTemplate>,
}

impl AppConfig {
    pub fn template(&self, name: &str) -> Option<&ResearchTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }
}

/// A reusable research recipe.
///
/// Front matter carries the metadata; bullet lines of the Markdown body
/// become the prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchTemplate {
    pub name: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub description: String,

    /// Default topic; may be empty when callers always supply one.
    #[serde(default)]
    pub topic: String,

    #[serde(default)]
    pub focus_areas: Vec<String>,

    #[serde(skip)]
    pub prompts: Vec<String>,
}

/// Per-run customisation of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateOverrides {
    pub topic: Option<String>,
    pub focus_areas: Vec<String>,

    /// Add `focus_areas` to the template's own instead of replacing them.
    pub append_focus_areas: bool,
}

impl ResearchTemplate {
    /// Build the request for one run of this template.
    pub fn to_request(&self, overrides: &TemplateOverrides) -> ResearchRequest {
        let topic = overrides
            .topic
            .clone()
            .unwrap_or_else(|| self.topic.clone());

        let focus_areas = if overrides.focus_areas.is_empty() {
            self.focus_areas.clone()
        } else if overrides.append_focus_areas {
            let mut areas = self.focus_areas.clone();
            for area in &overrides.focus_areas {
                if !areas.contains(area) {
                    areas.push(area.clone());
                }
            }
            areas
        } else {
            overrides.focus_areas.clone()
        };

        ResearchRequest {
            topic,
            focus_areas,
            prompts: self.prompts.clone(),
        }
    }
}

/// Extract bullet lines (`- ` or `* `) from a Markdown body.
pub(crate) fn parse_prompts(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")))
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> ResearchTemplate {
        ResearchTemplate {
            name: "market-scan".to_string(),
            category: "market".to_string(),
            description: String::new(),
            topic: "edge AI".to_string(),
            focus_areas: vec!["market size".to_string(), "competitors".to_string()],
            prompts: vec!["Who are the key players?".to_string()],
        }
    }

    #[test]
    fn test_to_request_uses_template_defaults() {
        let request = template().to_request(&TemplateOverrides::default());

        assert_eq!(request.topic, "edge AI");
        assert_eq!(request.focus_areas, vec!["market size", "competitors"]);
        assert_eq!(request.prompts, vec!["Who are the key players?"]);
    }

    #[test]
    fn test_to_request_replaces_focus_areas() {
        let overrides = TemplateOverrides {
            topic: Some("robotics".to_string()),
            focus_areas: vec!["regulation".to_string()],
            append_focus_areas: false,
        };
        let request = template().to_request(&overrides);

        assert_eq!(request.topic, "robotics");
        assert_eq!(request.focus_areas, vec!["regulation"]);
    }

    #[test]
    fn test_to_request_appends_focus_areas() {
        let overrides = TemplateOverrides {
            topic: None,
            focus_areas: vec!["competitors".to_string(), "pricing".to_string()],
            append_focus_areas: true,
        };
        let request = template().to_request(&overrides);

        assert_eq!(
            request.focus_areas,
            vec!["market size", "competitors", "pricing"]
        );
    }

    #[test]
    fn test_parse_prompts() {
        let body = "Intro paragraph\n\n- First question\n  * Second question\n-   \nnot a bullet";
        assert_eq!(parse_prompts(body), vec!["First question", "Second question"]);
    }
}
