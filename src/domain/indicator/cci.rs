//! CCI (Commodity Channel Index).
//!
//! `(typical price − SMA(tp)) / (0.015 × mean deviation)` over the trailing
//! window; a zero mean deviation yields 0. Output length is
//! `len - period + 1`.

use crate::domain::market::PriceBar;

use super::mean;

pub fn cci(bars: &[PriceBar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period {
        return Vec::new();
    }

    let typical: Vec<f64> = bars.iter().map(|b| b.typical_price()).collect();

    typical
        .windows(period)
        .map(|window| {
            let avg = mean(window);
            let mean_dev = window.iter().map(|v| (v - avg).abs()).sum::<f64>() / period as f64;
            if mean_dev == 0.0 {
                0.0
            } else {
                (window[window.len() - 1] - avg) / (0.015 * mean_dev)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::make_bars_hlc;

    #[test]
    fn insufficient_input_is_empty() {
        let bars = make_bars_hlc(&[(10.0, 8.0, 9.0); 19]);
        assert!(cci(&bars, 20).is_empty());
        assert!(cci(&[], 20).is_empty());
    }

    #[test]
    fn flat_series_is_zero() {
        let bars = make_bars_hlc(&[(10.0, 10.0, 10.0); 25]);
        let out = cci(&bars, 20);
        assert!(out.iter().all(|v| v.abs() < f64::EPSILON));
    }

    #[test]
    fn breakout_above_average_is_positive() {
        let mut spec = vec![(10.0, 10.0, 10.0); 19];
        spec.push((20.0, 20.0, 20.0));
        let bars = make_bars_hlc(&spec);
        let out = cci(&bars, 20);
        assert_eq!(out.len(), 1);
        assert!(out[0] > 100.0);
    }
}
