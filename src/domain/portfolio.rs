//! Portfolio aggregate and executed-trade records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::order::OrderSide;
use super::position::Position;

/// An executed trade posted to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub cash_balance: f64,
    pub total_value: f64,
    pub total_equity: f64,
    pub margin_used: f64,
    pub free_margin: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    /// Portfolio value at the start of the trading day, for day-change.
    pub day_open_value: f64,
    pub day_change: f64,
    pub positions: HashMap<String, Position>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Portfolio {
    pub fn new(
        id: impl Into<String>,
        owner: impl Into<String>,
        name: impl Into<String>,
        initial_cash: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Portfolio {
            id: id.into(),
            owner: owner.into(),
            name: name.into(),
            cash_balance: initial_cash,
            total_value: initial_cash,
            total_equity: initial_cash,
            margin_used: 0.0,
            free_margin: initial_cash,
            unrealized_pnl: 0.0,
            realized_pnl: 0.0,
            day_open_value: initial_cash,
            day_change: 0.0,
            positions: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    /// Total market value of all open positions.
    pub fn exposure(&self) -> f64 {
        self.positions.values().map(|p| p.market_value).sum()
    }

    /// Recompute aggregates. Afterward
    /// `total_value == cash_balance + Σ position.market_value`.
    pub fn recalculate(&mut self, now: DateTime<Utc>) {
        let position_value = self.exposure();
        self.unrealized_pnl = self.positions.values().map(|p| p.unrealized_pnl).sum();
        self.total_value = self.cash_balance + position_value;
        self.total_equity = self.total_value;
        self.free_margin = (self.total_equity - self.margin_used).max(0.0);
        self.day_change = self.total_value - self.day_open_value;
        self.updated_at = now;
    }

    /// Reset the day-change baseline to the current value.
    pub fn roll_day(&mut self) {
        self.day_open_value = self.total_value;
        self.day_change = 0.0;
    }
}
