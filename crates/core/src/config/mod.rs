//! Configuration loading and management.
//!
//! This module loads pipeline settings and research templates from the
//! `.research-pipeline/` directory structure.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use models::{AppConfig, ResearchTemplate, TemplateOverrides};
