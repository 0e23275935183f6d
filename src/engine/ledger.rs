//! Portfolio ledger: positions and cash from executed trades.
//!
//! All mutation of one portfolio happens under the ledger's map lock, so a
//! trade pass runs to completion before the next begins. Persistence is
//! best-effort: a failed save is logged and the in-memory state stands.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::error::EngineError;
use crate::domain::order::OrderSide;
use crate::domain::portfolio::{Portfolio, Trade};
use crate::domain::position::Position;
use crate::engine::events::EventBus;
use crate::ports::store::StorePort;

/// Order suggestion produced by [`Ledger::rebalance`].
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
}

pub struct Ledger {
    portfolios: Mutex<HashMap<String, Portfolio>>,
    store: Arc<dyn StorePort>,
    portfolio_bus: Arc<EventBus<Portfolio>>,
}

impl Ledger {
    pub fn new(store: Arc<dyn StorePort>, portfolio_bus: Arc<EventBus<Portfolio>>) -> Self {
        Self {
            portfolios: Mutex::new(HashMap::new()),
            store,
            portfolio_bus,
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Portfolio>> {
        self.portfolios.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn create_portfolio(
        &self,
        id: &str,
        owner: &str,
        name: &str,
        initial_cash: f64,
    ) -> Result<Portfolio, EngineError> {
        if initial_cash < 0.0 {
            return Err(EngineError::validation("initial cash must be non-negative"));
        }
        let mut map = self.map();
        if map.contains_key(id) {
            return Err(EngineError::validation(format!(
                "portfolio '{id}' already exists"
            )));
        }

        let portfolio = Portfolio::new(id, owner, name, initial_cash, Utc::now());
        map.insert(id.to_string(), portfolio.clone());
        drop(map);

        info!(portfolio = id, cash = initial_cash, "portfolio created");
        self.persist(&portfolio);
        self.portfolio_bus.publish(&portfolio);
        Ok(portfolio)
    }

    /// Snapshot of one portfolio.
    pub fn portfolio(&self, id: &str) -> Option<Portfolio> {
        self.map().get(id).cloned()
    }

    pub fn portfolio_ids(&self) -> Vec<String> {
        self.map().keys().cloned().collect()
    }

    /// Post executed trades. Buys debit `quantity*price + commission`; sells
    /// credit `quantity*price - commission` and realize
    /// `quantity*(price - avg_entry)`. A position netted to exactly zero is
    /// removed. The whole batch runs as one serialized pass over the
    /// portfolio.
    pub fn apply_trades(&self, portfolio_id: &str, trades: &[Trade]) -> Result<Portfolio, EngineError> {
        let mut map = self.map();
        let portfolio = map
            .get_mut(portfolio_id)
            .ok_or_else(|| EngineError::not_found("portfolio", portfolio_id))?;

        for trade in trades {
            apply_trade(portfolio, trade)?;
        }
        portfolio.recalculate(Utc::now());
        let snapshot = portfolio.clone();
        drop(map);

        for trade in trades {
            if let Err(err) = self.store.save_trade(portfolio_id, trade) {
                warn!(portfolio = portfolio_id, error = %err, "trade save failed");
            }
        }
        self.persist(&snapshot);
        self.portfolio_bus.publish(&snapshot);
        Ok(snapshot)
    }

    /// Revalue positions at current prices; positions without a quote keep
    /// their previous mark.
    pub fn mark_to_market(
        &self,
        portfolio_id: &str,
        prices: &HashMap<String, f64>,
    ) -> Result<Portfolio, EngineError> {
        let mut map = self.map();
        let portfolio = map
            .get_mut(portfolio_id)
            .ok_or_else(|| EngineError::not_found("portfolio", portfolio_id))?;

        let now = Utc::now();
        for position in portfolio.positions.values_mut() {
            if let Some(&price) = prices.get(&position.symbol) {
                position.mark(price, now);
            }
        }
        portfolio.recalculate(now);
        let snapshot = portfolio.clone();
        drop(map);

        self.persist(&snapshot);
        self.portfolio_bus.publish(&snapshot);
        Ok(snapshot)
    }

    /// Target-weight rebalancing. Weights are fractions of total portfolio
    /// value; an order is suggested only when the value delta exceeds 1% of
    /// the total. Quantity is the delta divided by the current price.
    pub fn rebalance(
        &self,
        portfolio_id: &str,
        targets: &HashMap<String, f64>,
        prices: &HashMap<String, f64>,
    ) -> Result<Vec<RebalanceOrder>, EngineError> {
        let map = self.map();
        let portfolio = map
            .get(portfolio_id)
            .ok_or_else(|| EngineError::not_found("portfolio", portfolio_id))?;

        let total = portfolio.total_value;
        let dead_band = total * 0.01;
        let mut orders = Vec::new();

        let mut symbols: Vec<&String> = targets.keys().collect();
        symbols.sort();
        for symbol in symbols {
            let target_value = targets[symbol] * total;
            let current_value = portfolio
                .position(symbol)
                .map(|p| p.market_value)
                .unwrap_or(0.0);
            let delta = target_value - current_value;
            if delta.abs() <= dead_band {
                continue;
            }

            let price = prices
                .get(symbol)
                .copied()
                .or_else(|| portfolio.position(symbol).map(|p| p.mark_price))
                .ok_or_else(|| {
                    EngineError::Data {
                        reason: format!("no price available for {symbol}"),
                    }
                })?;
            if price <= 0.0 {
                return Err(EngineError::Data {
                    reason: format!("non-positive price for {symbol}"),
                });
            }

            orders.push(RebalanceOrder {
                symbol: symbol.clone(),
                side: if delta > 0.0 {
                    OrderSide::Buy
                } else {
                    OrderSide::Sell
                },
                quantity: delta.abs() / price,
            });
        }
        Ok(orders)
    }

    /// Reset every portfolio's day-change baseline.
    pub fn roll_day(&self) {
        let mut map = self.map();
        for portfolio in map.values_mut() {
            portfolio.roll_day();
        }
    }

    fn persist(&self, portfolio: &Portfolio) {
        if let Err(err) = self.store.save_portfolio(portfolio) {
            warn!(portfolio = %portfolio.id, error = %err, "portfolio save failed");
        }
    }
}

fn apply_trade(portfolio: &mut Portfolio, trade: &Trade) -> Result<(), EngineError> {
    if trade.quantity <= 0.0 {
        return Err(EngineError::validation("trade quantity must be positive"));
    }

    match trade.side {
        OrderSide::Buy => {
            let cost = trade.quantity * trade.price + trade.commission;
            portfolio.cash_balance -= cost;
            match portfolio.positions.get_mut(&trade.symbol) {
                Some(position) => position.increase(trade.quantity, trade.price, trade.timestamp),
                None => {
                    let position = Position::open(
                        portfolio.id.clone(),
                        trade.symbol.clone(),
                        trade.quantity,
                        trade.price,
                        trade.timestamp,
                    );
                    portfolio.positions.insert(trade.symbol.clone(), position);
                }
            }
        }
        OrderSide::Sell => {
            let held = portfolio
                .positions
                .get_mut(&trade.symbol)
                .ok_or_else(|| {
                    EngineError::validation(format!("no position in {} to sell", trade.symbol))
                })?;
            if trade.quantity > held.quantity + 1e-9 {
                return Err(EngineError::validation(format!(
                    "sell of {} {} exceeds held {}",
                    trade.quantity, trade.symbol, held.quantity
                )));
            }
            let realized = held.reduce(trade.quantity, trade.price, trade.timestamp);
            portfolio.realized_pnl += realized;
            portfolio.cash_balance += trade.quantity * trade.price - trade.commission;
            if held.is_flat() {
                portfolio.positions.remove(&trade.symbol);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::MemoryStore;
    use chrono::TimeZone;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn trade(symbol: &str, side: OrderSide, quantity: f64, price: f64, commission: f64) -> Trade {
        Trade {
            symbol: symbol.into(),
            side,
            quantity,
            price,
            commission,
            timestamp: now(),
        }
    }

    fn ledger() -> (Ledger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store.clone(), Arc::new(EventBus::new()));
        ledger.create_portfolio("p1", "alice", "main", 100_000.0).unwrap();
        (ledger, store)
    }

    #[test]
    fn duplicate_portfolio_rejected() {
        let (ledger, _) = ledger();
        assert!(ledger.create_portfolio("p1", "bob", "other", 1.0).is_err());
    }

    #[test]
    fn buy_debits_cash_and_opens_position() {
        let (ledger, _) = ledger();
        let portfolio = ledger
            .apply_trades("p1", &[trade("AAPL", OrderSide::Buy, 10.0, 100.0, 5.0)])
            .unwrap();

        assert!((portfolio.cash_balance - (100_000.0 - 1_005.0)).abs() < 1e-9);
        let position = portfolio.position("AAPL").unwrap();
        assert!((position.quantity - 10.0).abs() < 1e-9);
        assert!(
            (portfolio.total_value - (portfolio.cash_balance + portfolio.exposure())).abs() < 1e-9
        );
    }

    #[test]
    fn sell_credits_cash_and_realizes() {
        let (ledger, _) = ledger();
        ledger
            .apply_trades("p1", &[trade("AAPL", OrderSide::Buy, 10.0, 100.0, 0.0)])
            .unwrap();
        let portfolio = ledger
            .apply_trades("p1", &[trade("AAPL", OrderSide::Sell, 4.0, 110.0, 2.0)])
            .unwrap();

        // realized 4 * (110 - 100) = 40
        assert!((portfolio.realized_pnl - 40.0).abs() < 1e-9);
        assert!((portfolio.cash_balance - (100_000.0 - 1_000.0 + 438.0)).abs() < 1e-9);
        assert!((portfolio.position("AAPL").unwrap().quantity - 6.0).abs() < 1e-9);
    }

    #[test]
    fn net_to_zero_removes_position() {
        let (ledger, _) = ledger();
        ledger
            .apply_trades(
                "p1",
                &[
                    trade("AAPL", OrderSide::Buy, 4.0, 100.0, 0.0),
                    trade("AAPL", OrderSide::Buy, 6.0, 102.0, 0.0),
                ],
            )
            .unwrap();
        let portfolio = ledger
            .apply_trades("p1", &[trade("AAPL", OrderSide::Sell, 10.0, 105.0, 0.0)])
            .unwrap();
        assert!(portfolio.position("AAPL").is_none());
    }

    #[test]
    fn oversell_is_rejected() {
        let (ledger, _) = ledger();
        ledger
            .apply_trades("p1", &[trade("AAPL", OrderSide::Buy, 5.0, 100.0, 0.0)])
            .unwrap();
        let result = ledger.apply_trades("p1", &[trade("AAPL", OrderSide::Sell, 6.0, 100.0, 0.0)]);
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn mark_to_market_revalues() {
        let (ledger, _) = ledger();
        ledger
            .apply_trades("p1", &[trade("AAPL", OrderSide::Buy, 10.0, 100.0, 0.0)])
            .unwrap();

        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), 120.0);
        let portfolio = ledger.mark_to_market("p1", &prices).unwrap();

        assert!((portfolio.unrealized_pnl - 200.0).abs() < 1e-9);
        assert!((portfolio.position("AAPL").unwrap().market_value - 1_200.0).abs() < 1e-9);
    }

    #[test]
    fn save_failure_keeps_in_memory_state() {
        let (ledger, store) = ledger();
        store.set_fail_saves(true);
        let portfolio = ledger
            .apply_trades("p1", &[trade("AAPL", OrderSide::Buy, 10.0, 100.0, 0.0)])
            .unwrap();
        assert!(portfolio.position("AAPL").is_some());
        assert!(ledger.portfolio("p1").unwrap().position("AAPL").is_some());
    }

    #[test]
    fn rebalance_respects_dead_band() {
        let (ledger, _) = ledger();
        ledger
            .apply_trades("p1", &[trade("AAPL", OrderSide::Buy, 100.0, 100.0, 0.0)])
            .unwrap();

        // Holding is 10% of a 100k portfolio; target 10.5% is inside the band
        let mut targets = HashMap::new();
        targets.insert("AAPL".to_string(), 0.105);
        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), 100.0);
        assert!(ledger.rebalance("p1", &targets, &prices).unwrap().is_empty());

        // Target 20% is well outside it
        targets.insert("AAPL".to_string(), 0.20);
        let orders = ledger.rebalance("p1", &targets, &prices).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert!((orders[0].quantity - 100.0).abs() < 1e-9);
    }

    #[test]
    fn rebalance_sells_overweight_holding() {
        let (ledger, _) = ledger();
        ledger
            .apply_trades("p1", &[trade("AAPL", OrderSide::Buy, 300.0, 100.0, 0.0)])
            .unwrap();

        let mut targets = HashMap::new();
        targets.insert("AAPL".to_string(), 0.10);
        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), 100.0);
        let orders = ledger.rebalance("p1", &targets, &prices).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Sell);
    }
}
