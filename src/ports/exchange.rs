//! Exchange connectivity port.
//!
//! Adapter failures surface as [`EngineError::Adapter`]; the core never
//! retries them, leaving the retry decision to the caller.

use std::collections::HashMap;

use crate::domain::error::EngineError;
use crate::domain::market::PriceBar;
use crate::domain::order::{OrderSide, OrderType};

/// Exchange-side view of a placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeOrder {
    /// Exchange-assigned identifier.
    pub id: String,
    pub symbol: String,
    /// Price the exchange reports the order working (or filling) at.
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
}

pub trait ExchangePort: Send + Sync {
    fn place_order(
        &self,
        symbol: &str,
        order_type: OrderType,
        side: OrderSide,
        quantity: f64,
        price: Option<f64>,
    ) -> Result<ExchangeOrder, EngineError>;

    fn cancel_order(&self, exchange_order_id: &str) -> Result<(), EngineError>;

    fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, EngineError>;

    fn fetch_balance(&self) -> Result<HashMap<String, f64>, EngineError>;

    fn fetch_ohlcv(&self, symbol: &str, limit: usize) -> Result<Vec<PriceBar>, EngineError>;
}
