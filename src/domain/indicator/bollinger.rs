//! Bollinger bands.
//!
//! Middle = SMA(period); upper/lower = middle ± multiplier × population
//! standard deviation of the same trailing window. Output length is
//! `len - period + 1`.

use super::{mean, population_stddev};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn bollinger_bands(prices: &[f64], period: usize, std_dev: f64) -> Vec<BollingerPoint> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }
    prices
        .windows(period)
        .map(|window| {
            let middle = mean(window);
            let offset = std_dev * population_stddev(window);
            BollingerPoint {
                upper: middle + offset,
                middle,
                lower: middle - offset,
            }
        })
        .collect()
}
