//! Adapters between the outside world and the orchestrator.

pub mod csv;
pub mod http;
