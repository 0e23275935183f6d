//! quantdesk: a simulated trading engine core.
//!
//! The pipeline: market data flows through the indicator library into the
//! strategy engine, which emits signals; the order manager validates against
//! the risk engine, executes through an exchange port, and posts fills to the
//! portfolio ledger, which the risk engine monitors.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod ports;
