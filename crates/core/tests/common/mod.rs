//! Common test utilities shared by the integration tests.
//!
//! This module provides:
//! - Test fixtures (items, requests, orchestrators)
//! - Collectors that can be held mid-stage
//! - Custom assertions and wait helpers

pub mod assertions;
pub mod fixtures;
pub mod mock_collectors;

pub use assertions::*;
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_collectors::*;
