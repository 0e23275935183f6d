//! Deterministic in-memory exchange for paper trading and tests.
//!
//! Prices are set explicitly; order placement returns the current price as
//! the working price. `fail_after(n)` makes every mutating call after the
//! next `n` fail with an adapter error; queries are unaffected.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::error::EngineError;
use crate::domain::market::PriceBar;
use crate::domain::order::{OrderSide, OrderType};
use crate::ports::exchange::{ExchangeOrder, ExchangePort, Ticker};

pub struct SimExchange {
    prices: Mutex<HashMap<String, f64>>,
    bars: Mutex<HashMap<String, Vec<PriceBar>>>,
    balances: Mutex<HashMap<String, f64>>,
    open_orders: Mutex<HashMap<String, ExchangeOrder>>,
    next_id: Mutex<u64>,
    /// Remaining successful mutating calls; `None` means never fail.
    remaining_successes: Mutex<Option<u64>>,
}

impl Default for SimExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl SimExchange {
    pub fn new() -> Self {
        Self {
            prices: Mutex::new(HashMap::new()),
            bars: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            open_orders: Mutex::new(HashMap::new()),
            next_id: Mutex::new(1),
            remaining_successes: Mutex::new(None),
        }
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(symbol.to_string(), price);
    }

    pub fn set_bars(&self, symbol: &str, bars: Vec<PriceBar>) {
        self.bars
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(symbol.to_string(), bars);
    }

    pub fn set_balance(&self, currency: &str, amount: f64) {
        self.balances
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(currency.to_string(), amount);
    }

    /// Allow `successes` more mutating calls, then fail every one after.
    pub fn fail_after(&self, successes: u64) {
        *self
            .remaining_successes
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(successes);
    }

    pub fn open_order_count(&self) -> usize {
        self.open_orders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn consume_budget(&self, operation: &str) -> Result<(), EngineError> {
        let mut remaining = self
            .remaining_successes
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        match remaining.as_mut() {
            None => Ok(()),
            Some(0) => Err(EngineError::adapter(format!("simulated {operation} failure"))),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
        }
    }

    fn price_of(&self, symbol: &str) -> Result<f64, EngineError> {
        self.prices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(symbol)
            .copied()
            .ok_or_else(|| EngineError::adapter(format!("no price for {symbol}")))
    }
}

impl ExchangePort for SimExchange {
    fn place_order(
        &self,
        symbol: &str,
        _order_type: OrderType,
        _side: OrderSide,
        _quantity: f64,
        price: Option<f64>,
    ) -> Result<ExchangeOrder, EngineError> {
        self.consume_budget("place_order")?;
        let working_price = match price {
            Some(p) => p,
            None => self.price_of(symbol)?,
        };

        let mut next = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
        let id = format!("sim-{}", *next);
        *next += 1;
        drop(next);

        let order = ExchangeOrder {
            id: id.clone(),
            symbol: symbol.to_string(),
            price: working_price,
        };
        self.open_orders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, order.clone());
        Ok(order)
    }

    fn cancel_order(&self, exchange_order_id: &str) -> Result<(), EngineError> {
        self.consume_budget("cancel_order")?;
        self.open_orders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(exchange_order_id)
            .map(|_| ())
            .ok_or_else(|| EngineError::adapter(format!("unknown order {exchange_order_id}")))
    }

    fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, EngineError> {
        let last = self.price_of(symbol)?;
        Ok(Ticker {
            symbol: symbol.to_string(),
            bid: last * 0.9995,
            ask: last * 1.0005,
            last,
        })
    }

    fn fetch_balance(&self) -> Result<HashMap<String, f64>, EngineError> {
        Ok(self
            .balances
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn fetch_ohlcv(&self, symbol: &str, limit: usize) -> Result<Vec<PriceBar>, EngineError> {
        let bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        let series = bars
            .get(symbol)
            .ok_or_else(|| EngineError::adapter(format!("no bars for {symbol}")))?;
        let start = series.len().saturating_sub(limit);
        Ok(series[start..].to_vec())
    }
}
