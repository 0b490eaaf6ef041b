//! Adapters behind the domain ports: storage backends and upstream gateways.

pub mod gateway;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
