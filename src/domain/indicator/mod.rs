//! Technical indicator library.
//!
//! Every function here is pure and deterministic over its input slice; no
//! shared state, safe to call concurrently. The common contract: when the
//! input is too short for the indicator's period, the result is empty rather
//! than an error.

pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod ichimoku;
pub mod macd;
pub mod mfi;
pub mod parabolic_sar;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod support_resistance;
pub mod vwap;
pub mod williams_r;

pub use atr::atr;
pub use bollinger::{bollinger_bands, BollingerPoint};
pub use cci::cci;
pub use ema::ema;
pub use ichimoku::{ichimoku, IchimokuPoint};
pub use macd::{macd, MacdPoint};
pub use mfi::mfi;
pub use parabolic_sar::parabolic_sar;
pub use rsi::rsi;
pub use sma::sma;
pub use stochastic::{stochastic, StochasticPoint};
pub use support_resistance::{find_support_resistance, SupportResistance};
pub use vwap::vwap;
pub use williams_r::williams_r;

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by n, not n-1).
pub(crate) fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_basic() {
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < f64::EPSILON);
        assert!((mean(&[]) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn population_stddev_known_value() {
        // Population stddev of [2, 4, 4, 4, 5, 5, 7, 9] is exactly 2
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_stddev(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn population_stddev_constant_series() {
        assert!((population_stddev(&[5.0; 10]) - 0.0).abs() < f64::EPSILON);
    }
}
