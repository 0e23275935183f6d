//! Ichimoku cloud.
//!
//! Tenkan-sen = midpoint of the 9-bar high/low range; Kijun-sen = midpoint of
//! the 26-bar range; Senkou span A = (tenkan + kijun) / 2; Senkou span B =
//! midpoint of the 52-bar range; Chikou = close shifted back 26 bars (None
//! near the tail). Spans are reported unshifted, aligned to the bar they were
//! computed from. Output covers bars from index `senkou_b_period - 1` on.

use crate::domain::market::PriceBar;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IchimokuPoint {
    pub tenkan: f64,
    pub kijun: f64,
    pub senkou_a: f64,
    pub senkou_b: f64,
    pub chikou: Option<f64>,
}

fn range_midpoint(bars: &[PriceBar]) -> f64 {
    let highest = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let lowest = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    (highest + lowest) / 2.0
}

pub fn ichimoku(
    bars: &[PriceBar],
    tenkan_period: usize,
    kijun_period: usize,
    senkou_b_period: usize,
) -> Vec<IchimokuPoint> {
    if tenkan_period == 0
        || kijun_period == 0
        || senkou_b_period == 0
        || bars.len() < senkou_b_period
    {
        return Vec::new();
    }

    (senkou_b_period - 1..bars.len())
        .map(|i| {
            let tenkan = range_midpoint(&bars[i + 1 - tenkan_period..=i]);
            let kijun = range_midpoint(&bars[i + 1 - kijun_period..=i]);
            let senkou_b = range_midpoint(&bars[i + 1 - senkou_b_period..=i]);
            let chikou = bars.get(i + kijun_period).map(|b| b.close);
            IchimokuPoint {
                tenkan,
                kijun,
                senkou_a: (tenkan + kijun) / 2.0,
                senkou_b,
                chikou,
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
        let bars = make_bars_hlc(&[(10.0, 8.0, 9.0); 51]);
        assert!(ichimoku(&bars, 9, 26, 52).is_empty());
    }

    #[test]
    fn flat_series_collapses_to_price() {
        let bars = make_bars_hlc(&[(10.0, 10.0, 10.0); 60]);
        let out = ichimoku(&bars, 9, 26, 52);
        assert_eq!(out.len(), 9);
        for point in &out {
            assert!((point.tenkan - 10.0).abs() < f64::EPSILON);
            assert!((point.kijun - 10.0).abs() < f64::EPSILON);
            assert!((point.senkou_a - 10.0).abs() < f64::EPSILON);
            assert!((point.senkou_b - 10.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn chikou_present_only_where_future_close_exists() {
        let bars = make_bars_hlc(&[(10.0, 10.0, 10.0); 80]);
        let out = ichimoku(&bars, 9, 26, 52);
        assert!(out.first().unwrap().chikou.is_some());
        assert!(out.last().unwrap().chikou.is_none());
    }

    #[test]
    fn tenkan_reacts_faster_than_kijun() {
        // Flat then a jump: the 9-bar midpoint moves further than the 26-bar
        let mut spec = vec![(100.0, 100.0, 100.0); 55];
        spec.extend(vec![(120.0, 120.0, 120.0); 5]);
        let bars = make_bars_hlc(&spec);
        let last = *ichimoku(&bars, 9, 26, 52).last().unwrap();
        assert!(last.tenkan >= last.kijun);
    }
}
