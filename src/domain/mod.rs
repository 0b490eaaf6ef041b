//! Domain types and the ports the orchestrator depends on.

pub mod gateway;
pub mod merchant;
pub mod ports;
pub mod transaction;
