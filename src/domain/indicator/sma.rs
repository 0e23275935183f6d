//! Simple moving average.
//!
//! Output value i is the mean of the trailing `period` prices ending at
//! input index `i + period - 1`; output length is `len - period + 1`.

use super::mean;

pub fn sma(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }
    prices.windows(period).map(mean).collect()
}
