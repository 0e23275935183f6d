//! MFI (Money Flow Index).
//!
//! Raw money flow = typical price × volume, classified positive/negative by
//! the typical-price change from the prior bar. `MFI = 100 − 100 / (1 + ratio)`
//! over the trailing window; zero negative flow is a defined edge case
//! yielding 100. Needs `period + 1` bars; output length is `len - period`.

use crate::domain::market::PriceBar;

pub fn mfi(bars: &[PriceBar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period + 1 {
        return Vec::new();
    }

    // Signed money flow per change: positive flows keep their sign, negative
    // flows are negated, flat changes contribute nothing.
    let flows: Vec<(f64, f64)> = bars
        .windows(2)
        .map(|w| {
            let flow = w[1].typical_price() * w[1].volume;
            let change = w[1].typical_price() - w[0].typical_price();
            if change > 0.0 {
                (flow, 0.0)
            } else if change < 0.0 {
                (0.0, flow)
            } else {
                (0.0, 0.0)
            }
        })
        .collect();

    flows
        .windows(period)
        .map(|window| {
            let positive: f64 = window.iter().map(|&(p, _)| p).sum();
            let negative: f64 = window.iter().map(|&(_, n)| n).sum();
            if negative == 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + positive / negative)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::make_bars_hlcv;

    #[test]
    fn insufficient_input_is_empty() {
        let bars = make_bars_hlcv(&[(10.0, 8.0, 9.0, 100.0); 14]);
        assert!(mfi(&bars, 14).is_empty());
    }

    #[test]
    fn all_rising_is_hundred() {
        let spec: Vec<(f64, f64, f64, f64)> = (0..20)
            .map(|i| {
                let p = 100.0 + i as f64;
                (p, p, p, 100.0)
            })
            .collect();
        let bars = make_bars_hlcv(&spec);
        let out = mfi(&bars, 14);
        assert!(!out.is_empty());
        assert!(out.iter().all(|v| (v - 100.0).abs() < f64::EPSILON));
    }

    #[test]
    fn all_falling_is_zero() {
        let spec: Vec<(f64, f64, f64, f64)> = (0..20)
            .map(|i| {
                let p = 100.0 - i as f64;
                (p, p, p, 100.0)
            })
            .collect();
        let bars = make_bars_hlcv(&spec);
        let out = mfi(&bars, 14);
        assert!(out.iter().all(|v| v.abs() < f64::EPSILON));
    }

    #[test]
    fn stays_in_range() {
        let spec: Vec<(f64, f64, f64, f64)> = (0..40)
            .map(|i| {
                let p = 100.0 + (i as f64 * 0.8).sin() * 10.0;
                (p + 1.0, p - 1.0, p, 100.0 + (i % 7) as f64 * 50.0)
            })
            .collect();
        let bars = make_bars_hlcv(&spec);
        for v in mfi(&bars, 14) {
            assert!((0.0..=100.0).contains(&v));
        }
    }
}
