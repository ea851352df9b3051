//! Configuration file loader for the `.research-pipeline/` directory.
//!
//! This module loads and parses all configuration files from the
//! `.research-pipeline/` directory, including:
//! - `config.toml`: Pipeline settings (retry, aggregation, bus, retention)
//! - `templates/*.md`: Research templates with YAML front matter

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::models::{parse_prompts, AppConfig, ResearchTemplate};
use gray_matter::engine::YAML;
use gray_matter::Matter;
use rp_protocol::PipelineSettings;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Name of the configuration directory under the project root.
pub const CONFIG_DIR: &str = ".research-pipeline";

/// Loads all configuration from the `.research-pipeline/` directory.
///
/// # Arguments
///
/// * `root` - Root directory containing the `.research-pipeline/` folder
///
/// # Returns
///
/// An `AppConfig` containing all loaded configuration. Missing directories
/// or files yield defaults rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid syntax (TOML or Markdown front matter)
/// - Settings are out of range or template names are missing or repeated
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let config_dir = root.join(CONFIG_DIR);

    if !config_dir.exists() {
        debug!(path = %config_dir.display(), "no configuration directory, using defaults");
        return Ok(AppConfig::default());
    }

    let settings = load_settings(&config_dir)?;
    let templates = load_templates(&config_dir)?;

    Ok(AppConfig {
        settings,
        templates,
    })
}

/// Loads pipeline settings from `config.toml`.
fn load_settings(config_dir: &Path) -> ConfigResult<PipelineSettings> {
    let config_path = config_dir.join("config.toml");

    if !config_path.exists() {
        return Ok(PipelineSettings::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let settings: PipelineSettings =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path.clone(),
            source,
        })?;

    validate_settings(&settings).map_err(|reason| ConfigError::InvalidConfig {
        path: config_path,
        reason,
    })?;

    Ok(settings)
}

fn validate_settings(settings: &PipelineSettings) -> Result<(), String> {
    let checks = [
        ("retry.max_attempts", settings.retry.max_attempts as usize),
        ("bus.capacity", settings.bus.capacity),
        ("aggregation.max_insights", settings.aggregation.max_insights),
        (
            "aggregation.max_recommendations",
            settings.aggregation.max_recommendations,
        ),
        ("aggregation.max_risks", settings.aggregation.max_risks),
    ];

    match checks.iter().find(|(_, value)| *value == 0) {
        Some((key, _)) => Err(format!("{key} must be at least 1")),
        None => Ok(()),
    }
}

/// Loads all research templates from `templates/*.md`.
fn load_templates(config_dir: &Path) -> ConfigResult<Vec<ResearchTemplate>> {
    let templates_dir = config_dir.join("templates");

    if !templates_dir.exists() {
        return Ok(Vec::new());
    }

    let mut templates = Vec::new();
    let mut names = HashSet::new();

    for entry in WalkDir::new(&templates_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: templates_dir.clone(),
            source,
        })?;

        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("md") {
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let matter = Matter::<YAML>::new();
        let result = matter.parse(&content);

        let mut template: ResearchTemplate = result
            .data
            .ok_or_else(|| ConfigError::MarkdownParse {
                path: path.to_path_buf(),
                reason: "Missing YAML front matter".to_string(),
            })?
            .deserialize()
            .map_err(|e| ConfigError::MarkdownParse {
                path: path.to_path_buf(),
                reason: format!("Failed to deserialize front matter: {}", e),
            })?;

        if template.name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig {
                path: path.to_path_buf(),
                reason: "template name is empty".to_string(),
            });
        }
        if !names.insert(template.name.clone()) {
            return Err(ConfigError::InvalidConfig {
                path: path.to_path_buf(),
                reason: format!("duplicate template name '{}'", template.name),
            });
        }

        template.prompts = parse_prompts(&result.content);
        templates.push(template);
    }

    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const MARKET_TEMPLATE: &str = r#"---
name: market-scan
category: market
description: Competitive landscape overview
topic: edge AI accelerators
focus_areas:
  - market size
  - competitors
---

Answer the following:
- Who are the key players?
- What are the pricing trends?"#;

    #[tokio::test]
    async fn test_load_config_acceptance() {
        let dir = tempdir().expect("Failed to create temp dir");
        let root = dir.path();
        let config_dir = root.join(CONFIG_DIR);
        fs::create_dir_all(config_dir.join("templates")).expect("Failed to create templates dir");

        let config_toml = r#"
[retry]
max_attempts = 5
base_delay_ms = 50

[aggregation]
max_risks = 4
"#;
        fs::write(config_dir.join("config.toml"), config_toml).expect("Failed to write config.toml");
        fs::write(config_dir.join("templates/market.md"), MARKET_TEMPLATE)
            .expect("Failed to write template");
        fs::write(config_dir.join("templates/notes.txt"), "ignored").expect("Failed to write notes");

        let config = load_config(root).await.expect("Should load config");

        assert_eq!(config.settings.retry.max_attempts, 5);
        assert_eq!(config.settings.retry.base_delay_ms, 50);
        assert_eq!(config.settings.retry.item_timeout_ms, 120_000);
        assert_eq!(config.settings.aggregation.max_risks, 4);
        assert_eq!(config.settings.aggregation.max_insights, 5);

        assert_eq!(config.templates.len(), 1);
        let template = config.template("market-scan").expect("template loaded");
        assert_eq!(template.category, "market");
        assert_eq!(template.focus_areas, vec!["market size", "competitors"]);
        assert_eq!(
            template.prompts,
            vec!["Who are the key players?", "What are the pricing trends?"]
        );
    }

    #[tokio::test]
    async fn test_load_config_empty_directory() {
        let dir = tempdir().expect("Failed to create temp dir");

        let config = load_config(dir.path())
            .await
            .expect("Should handle missing .research-pipeline");

        assert_eq!(config.settings, PipelineSettings::default());
        assert!(config.templates.is_empty());
    }

    #[tokio::test]
    async fn test_load_config_invalid_toml() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");
        fs::write(config_dir.join("config.toml"), "[retry\nmax_attempts = ")
            .expect("Failed to write config.toml");

        match load_config(dir.path()).await {
            Err(ConfigError::TomlParse { path, .. }) => assert!(path.ends_with("config.toml")),
            other => panic!("Expected TomlParse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_config_rejects_zero_attempts() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");
        fs::write(config_dir.join("config.toml"), "[retry]\nmax_attempts = 0")
            .expect("Failed to write config.toml");

        match load_config(dir.path()).await {
            Err(ConfigError::InvalidConfig { reason, .. }) => {
                assert!(reason.contains("retry.max_attempts"))
            }
            other => panic!("Expected InvalidConfig error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_config_template_no_frontmatter() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(config_dir.join("templates")).expect("Failed to create templates dir");
        fs::write(config_dir.join("templates/plain.md"), "Just plain markdown content")
            .expect("Failed to write template");

        match load_config(dir.path()).await {
            Err(ConfigError::MarkdownParse { path, reason }) => {
                assert!(path.ends_with("plain.md"));
                assert!(reason.contains("Missing YAML front matter"));
            }
            other => panic!("Expected MarkdownParse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_config_duplicate_template_names() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(config_dir.join("templates")).expect("Failed to create templates dir");
        fs::write(config_dir.join("templates/a.md"), MARKET_TEMPLATE).expect("write a");
        fs::write(config_dir.join("templates/b.md"), MARKET_TEMPLATE).expect("write b");

        match load_config(dir.path()).await {
            Err(ConfigError::InvalidConfig { path, reason }) => {
                assert!(path.ends_with("b.md"));
                assert!(reason.contains("duplicate"));
            }
            other => panic!("Expected InvalidConfig error, got {other:?}"),
        }
    }
}
