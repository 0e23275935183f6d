//! Core domain types and pure logic.

pub mod account;
pub mod error;
pub mod indicator;
pub mod limits;
pub mod market;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod signal;
