//! Shared fixtures for the integration suite.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use quantdesk::adapters::memory_store::MemoryStore;
use quantdesk::adapters::sim_exchange::SimExchange;
use quantdesk::domain::limits::RiskLimits;
use quantdesk::domain::market::PriceBar;
use quantdesk::engine::Engine;
use quantdesk::engine::orders::CommissionSchedule;

/// Hourly bars from closes; open = close, high/low one unit around it.
#[allow(dead_code)]
pub fn hourly_bars(symbol: &str, closes: &[f64]) -> Vec<PriceBar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            symbol: symbol.to_string(),
            timestamp: start + Duration::hours(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
        })
        .collect()
}

/// Engine over the simulated exchange and in-memory store, with one funded
/// portfolio `p1`.
#[allow(dead_code)]
pub fn engine_with_portfolio(initial_cash: f64) -> (Engine, Arc<SimExchange>, Arc<MemoryStore>) {
    let exchange = Arc::new(SimExchange::new());
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(
        exchange.clone(),
        store.clone(),
        RiskLimits::default(),
        CommissionSchedule::default(),
    );
    engine
        .ledger
        .create_portfolio("p1", "alice", "main", initial_cash)
        .unwrap();
    (engine, exchange, store)
}
