//! Price bar representation and symbol classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV bar. Immutable once produced; series are ordered by
/// timestamp ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Extract the close series from a bar window.
pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Coarse asset classification derived from symbol shape. Drives the
/// market-hours gate and the commission schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetClass {
    Crypto,
    Fx,
    Equity,
}

const FX_CURRENCIES: [&str; 8] = ["USD", "EUR", "GBP", "JPY", "AUD", "NZD", "CAD", "CHF"];

impl AssetClass {
    pub fn of(symbol: &str) -> AssetClass {
        let upper = symbol.to_uppercase();
        if upper.ends_with("USDT") || upper.ends_with("USDC") || upper.ends_with("BTC") {
            return AssetClass::Crypto;
        }
        if upper.len() == 6 {
            let (base, quote) = upper.split_at(3);
            if FX_CURRENCIES.contains(&base) && FX_CURRENCIES.contains(&quote) {
                return AssetClass::Fx;
            }
        }
        AssetClass::Equity
    }
}
