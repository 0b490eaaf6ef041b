//! Application layer containing the payment protocol orchestration.
//!
//! `PaymentOrchestrator` is the single entry point used by the HTTP interface.
//! It authenticates merchants, talks to the resolved gateway under a timeout
//! and settles transactions through the storage ports.

pub mod orchestrator;
