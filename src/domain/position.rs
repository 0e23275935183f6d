//! Position tracking for the long-only portfolio model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

/// A holding in one symbol. Quantity is non-negative in this long-only model;
/// the ledger removes the position the instant quantity reaches zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub portfolio_id: String,
    pub symbol: String,
    pub quantity: f64,
    /// Volume-weighted average entry price. Recomputed on increasing trades,
    /// unchanged on decreasing trades.
    pub avg_price: f64,
    pub mark_price: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_pct: f64,
    pub side: PositionSide,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn open(
        portfolio_id: impl Into<String>,
        symbol: impl Into<String>,
        quantity: f64,
        price: f64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut position = Position {
            portfolio_id: portfolio_id.into(),
            symbol: symbol.into(),
            quantity,
            avg_price: price,
            mark_price: price,
            market_value: 0.0,
            unrealized_pnl: 0.0,
            unrealized_pnl_pct: 0.0,
            side: PositionSide::Long,
            opened_at: now,
            updated_at: now,
        };
        position.mark(price, now);
        position
    }

    /// Add to the position at `price`, recomputing the weighted-average entry.
    pub fn increase(&mut self, quantity: f64, price: f64, now: DateTime<Utc>) {
        let total_cost = self.avg_price * self.quantity + price * quantity;
        self.quantity += quantity;
        self.avg_price = total_cost / self.quantity;
        self.mark(self.mark_price.max(0.0), now);
    }

    /// Reduce the position, returning the realized P&L of the reduction:
    /// `quantity * (price - avg_price)`. The average entry is unchanged.
    pub fn reduce(&mut self, quantity: f64, price: f64, now: DateTime<Utc>) -> f64 {
        let realized = quantity * (price - self.avg_price);
        self.quantity -= quantity;
        self.mark(price, now);
        realized
    }

    /// Revalue at the current market price.
    pub fn mark(&mut self, price: f64, now: DateTime<Utc>) {
        self.mark_price = price;
        self.market_value = self.quantity * price;
        self.unrealized_pnl = self.quantity * (price - self.avg_price);
        self.unrealized_pnl_pct = if self.avg_price > 0.0 {
            (price - self.avg_price) / self.avg_price * 100.0
        } else {
            0.0
        };
        self.updated_at = now;
    }

    /// True once the quantity has been netted down to zero.
    pub fn is_flat(&self) -> bool {
        self.quantity.abs() <= 1e-9
    }
}
