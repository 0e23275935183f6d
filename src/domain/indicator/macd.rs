//! MACD (Moving Average Convergence Divergence).
//!
//! Line = EMA(fast) − EMA(slow); signal = EMA(signal period) of the line;
//! histogram = line − signal. EMAs are seeded from the first price, so all
//! three series share the input's length. Empty when the input is shorter
//! than the slow period.

use super::ema::ema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<MacdPoint> {
    if fast == 0 || slow == 0 || signal == 0 || prices.len() < slow {
        return Vec::new();
    }

    let fast_ema = ema(prices, fast);
    let slow_ema = ema(prices, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&line, signal);

    line.iter()
        .zip(&signal_line)
        .map(|(&m, &s)| MacdPoint {
            macd: m,
            signal: s,
            histogram: m - s,
        })
        .collect()
}
