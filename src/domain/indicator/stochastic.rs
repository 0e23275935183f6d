//! Stochastic oscillator.
//!
//! %K = 100 × (close − lowest low) / (highest high − lowest low) over the
//! trailing `k_period`; %D = SMA(`d_period`) of %K. A flat range (highest ==
//! lowest) yields the 50 midpoint rather than dividing by zero. Output length
//! is `len - k_period - d_period + 2` aligned to the %D series.

use crate::domain::market::PriceBar;
use serde::{Deserialize, Serialize};

use super::sma::sma;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticPoint {
    pub k: f64,
    pub d: f64,
}

pub fn stochastic(bars: &[PriceBar], k_period: usize, d_period: usize) -> Vec<StochasticPoint> {
    if k_period == 0 || d_period == 0 || bars.len() < k_period + d_period - 1 {
        return Vec::new();
    }

    let k_series: Vec<f64> = bars
        .windows(k_period)
        .map(|window| {
            let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            let close = window[window.len() - 1].close;
            if highest == lowest {
                50.0
            } else {
                100.0 * (close - lowest) / (highest - lowest)
            }
        })
        .collect();

    let d_series = sma(&k_series, d_period);
    let offset = k_series.len() - d_series.len();

    d_series
        .iter()
        .enumerate()
        .map(|(i, &d)| StochasticPoint {
            k: k_series[i + offset],
            d,
        })
        .collect()
}
