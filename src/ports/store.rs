//! Persistence port.
//!
//! The core treats persistence as best-effort: a failed save is logged by the
//! caller and the in-memory business operation stands.

use crate::domain::error::EngineError;
use crate::domain::order::Order;
use crate::domain::portfolio::{Portfolio, Trade};

pub trait StorePort: Send + Sync {
    fn save_portfolio(&self, portfolio: &Portfolio) -> Result<(), EngineError>;

    fn save_order(&self, order: &Order) -> Result<(), EngineError>;

    fn save_trade(&self, portfolio_id: &str, trade: &Trade) -> Result<(), EngineError>;

    fn fetch_portfolio(&self, id: &str) -> Result<Option<Portfolio>, EngineError>;

    fn fetch_order(&self, id: u64) -> Result<Option<Order>, EngineError>;
}
