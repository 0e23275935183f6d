//! Account snapshot consumed by the risk engine.

use serde::{Deserialize, Serialize};

/// Point-in-time view of the trading account backing a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub balance: f64,
    pub equity: f64,
    pub margin_used: f64,
    pub free_margin: f64,
}

impl AccountSnapshot {
    pub fn with_balance(balance: f64) -> Self {
        AccountSnapshot {
            balance,
            equity: balance,
            margin_used: 0.0,
            free_margin: balance,
        }
    }

    /// Margin level as a percent of used margin; infinite when unused.
    pub fn margin_level_pct(&self) -> f64 {
        if self.margin_used > 0.0 {
            self.equity / self.margin_used * 100.0
        } else {
            f64::INFINITY
        }
    }
}
