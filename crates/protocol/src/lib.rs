//! # rp-protocol
//!
//! Protocol definitions and data models for the research pipeline.
//!
//! This crate defines all shared data structures used for:
//! - Configuration file parsing (`config.toml`)
//! - Runtime process and stage state
//! - Analysis items, outcomes, aggregated results and reports
//! - Control operations and bus events exchanged with transport adapters
//!
//! ## Modules
//!
//! - [`analysis_models`]: Collected items, per-item outcomes, summaries
//! - [`config_models`]: Pipeline settings from config.toml
//! - [`process_models`]: Process and stage state
//! - [`ipc`]: Operations and Events
//!
//! All wire types derive `TS` so the dashboard can generate matching
//! TypeScript definitions.

pub mod analysis_models;
pub mod config_models;
pub mod ipc;
pub mod process_models;

// Re-export all public types for convenience
pub use analysis_models::*;
pub use config_models::*;
pub use ipc::*;
pub use process_models::*;
