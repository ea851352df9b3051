//! # rp-core
//!
//! Core research pipeline: process orchestration, stage execution and
//! analysis for research-pipeline.
//!
//! This crate provides:
//! - Configuration loading from the `.research-pipeline/` directory
//! - The analysis client abstraction with per-item retry and fallback
//! - The four-stage execution engine (collection, validation, analysis, report)
//! - Process orchestration with pause, resume and stop
//! - An in-process update bus for progress and live logs
//! - Process, stage and item metrics through the `metrics` facade
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and research templates
//! - [`analysis`]: AnalysisClient trait, retry policy and adapters
//! - [`collect`]: Collector trait and built-in sources
//! - [`aggregate`]: Deterministic aggregation of analysis outcomes
//! - [`engine`]: Stage runner
//! - [`state`]: Process state machine and orchestrator
//! - [`bus`]: Update bus
//! - [`telemetry`]: Metric names and recording

pub mod aggregate;
pub mod analysis;
pub mod bus;
pub mod collect;
pub mod config;
pub mod engine;
pub mod state;
pub mod telemetry;

pub use aggregate::{AggregationError, AnalysisAggregator};
pub use bus::{Subscription, UpdateBus};
pub use engine::{StageOutcome, StageRunner};
pub use state::{OrchestratorError, ProcessOrchestrator};
