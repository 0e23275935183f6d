//! Williams %R.
//!
//! `-100 × (highest high − close) / (highest high − lowest low)` over the
//! trailing window, ranging from 0 (close at the high) to −100 (close at the
//! low). A flat range yields the −50 midpoint. Output length is
//! `len - period + 1`.

use crate::domain::market::PriceBar;

pub fn williams_r(bars: &[PriceBar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period {
        return Vec::new();
    }

    bars.windows(period)
        .map(|window| {
            let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            let close = window[window.len() - 1].close;
            if highest == lowest {
                -50.0
            } else {
                -100.0 * (highest - close) / (highest - lowest)
            }
        })
        .collect()
}
