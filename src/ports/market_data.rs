//! Market-data port.
//!
//! The core consumes a finite, time-ordered window of bars per invocation;
//! live streaming stays outside the boundary.

use chrono::{DateTime, Utc};

use crate::domain::error::EngineError;
use crate::domain::market::PriceBar;

pub trait MarketDataPort {
    /// Fetch bars for `symbol` within `[start, end]`, ordered by timestamp
    /// ascending.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, EngineError>;

    fn list_symbols(&self) -> Result<Vec<String>, EngineError>;
}
