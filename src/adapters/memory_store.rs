//! In-memory store with injectable save failure.
//!
//! The failure switch exists so the core's best-effort persistence semantics
//! can be tested: in-memory business state must survive a failed save.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::error::EngineError;
use crate::domain::order::Order;
use crate::domain::portfolio::{Portfolio, Trade};
use crate::ports::store::StorePort;

#[derive(Default)]
pub struct MemoryStore {
    portfolios: Mutex<HashMap<String, Portfolio>>,
    orders: Mutex<HashMap<u64, Order>>,
    trades: Mutex<Vec<(String, Trade)>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn trade_count(&self) -> usize {
        self.trades.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn check_writable(&self) -> Result<(), EngineError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(EngineError::adapter("simulated save failure"));
        }
        Ok(())
    }
}

impl StorePort for MemoryStore {
    fn save_portfolio(&self, portfolio: &Portfolio) -> Result<(), EngineError> {
        self.check_writable()?;
        self.portfolios
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(portfolio.id.clone(), portfolio.clone());
        Ok(())
    }

    fn save_order(&self, order: &Order) -> Result<(), EngineError> {
        self.check_writable()?;
        self.orders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(order.id.0, order.clone());
        Ok(())
    }

    fn save_trade(&self, portfolio_id: &str, trade: &Trade) -> Result<(), EngineError> {
        self.check_writable()?;
        self.trades
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((portfolio_id.to_string(), trade.clone()));
        Ok(())
    }

    fn fetch_portfolio(&self, id: &str) -> Result<Option<Portfolio>, EngineError> {
        Ok(self
            .portfolios
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned())
    }

    fn fetch_order(&self, id: u64) -> Result<Option<Order>, EngineError> {
        Ok(self
            .orders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn save_and_fetch_portfolio() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let portfolio = Portfolio::new("p1", "alice", "main", 100_000.0, now);

        store.save_portfolio(&portfolio).unwrap();
        let loaded = store.fetch_portfolio("p1").unwrap().unwrap();
        assert_eq!(loaded, portfolio);
        assert!(store.fetch_portfolio("missing").unwrap().is_none());
    }

    #[test]
    fn fail_saves_switch() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let portfolio = Portfolio::new("p1", "alice", "main", 100_000.0, now);

        store.set_fail_saves(true);
        assert!(store.save_portfolio(&portfolio).is_err());

        store.set_fail_saves(false);
        assert!(store.save_portfolio(&portfolio).is_ok());
    }
}
