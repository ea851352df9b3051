//! Analysis capability abstraction and per-item retry.
//!
//! This module provides the `AnalysisClient` trait (Adapter Pattern), the
//! retry policy that turns every item into an outcome, and the
//! primary/fallback client chain.

pub mod adapters;
pub mod base;
pub mod fallback;
pub mod retry;

pub use adapters::{ScriptedClient, SimulatedClient};
pub use base::{AnalysisClient, AnalysisError, ItemAnalysis};
pub use fallback::FallbackClient;
pub use retry::{analyze_with_retry, RetryPolicy};
