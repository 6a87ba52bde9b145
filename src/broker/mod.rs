pub mod client;
pub mod instruments;

// Re-export the client and instrument types for convenient access
// (e.g. `use crate::broker::BrokerClient`).
pub use client::BrokerClient;
pub use instruments::{equity_instruments, Instrument};
