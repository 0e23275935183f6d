//! Boundary traits implemented by adapters.

pub mod exchange;
pub mod market_data;
pub mod store;
