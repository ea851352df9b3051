//! Analysis client implementations.

pub mod mock_client;
mod simulated;

pub use mock_client::{ItemGate, ScriptedClient};
pub use simulated::SimulatedClient;
