//! Concrete implementations of the port traits.

pub mod config;
pub mod csv_feed;
pub mod memory_store;
pub mod sim_exchange;
