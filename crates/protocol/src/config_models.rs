//! Pipeline configuration models for `.research-pipeline/config.toml`.
//!
//! Every field has a default, so an absent or partial file is valid.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Represents the settings from `.research-pipeline/config.toml`.
///
/// # Example
///
/// ```toml
/// [retry]
/// max_attempts = 3
/// base_delay_ms = 500
///
/// [aggregation]
/// max_insights = 5
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct PipelineSettings {
    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub aggregation: AggregationSettings,

    #[serde(default)]
    pub bus: BusSettings,

    #[serde(default)]
    pub retention: RetentionSettings,
}

/// Per-item retry policy for the analysis stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum calls per item, including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles for each further attempt.
    pub base_delay_ms: u64,

    /// Upper bound on the whole retry loop of a single item.
    pub item_timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            item_timeout_ms: 120_000,
        }
    }
}

/// Caps applied to the aggregated result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct AggregationSettings {
    pub max_insights: usize,
    pub max_recommendations: usize,
    pub max_risks: usize,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            max_insights: 5,
            max_recommendations: 5,
            max_risks: 3,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct BusSettings {
    /// Events buffered per subscriber before a slow one starts lagging.
    pub capacity: usize,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct RetentionSettings {
    /// How long terminal processes stay queryable.
    pub finished_retention_secs: u64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            finished_retention_secs: 3600,
        }
    }
}
