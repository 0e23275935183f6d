//! VWAP (Volume-Weighted Average Price).
//!
//! Cumulative `Σ(typical price × volume) / Σ volume` from the start of the
//! series. When the cumulative volume is still zero the typical price is used
//! as the fallback.

use crate::domain::market::PriceBar;

pub fn vwap(bars: &[PriceBar]) -> Vec<f64> {
    let mut cumulative_pv = 0.0;
    let mut cumulative_volume = 0.0;
    bars.iter()
        .map(|bar| {
            let typical = bar.typical_price();
            cumulative_pv += typical * bar.volume;
            cumulative_volume += bar.volume;
            if cumulative_volume > 0.0 {
                cumulative_pv / cumulative_volume
            } else {
                typical
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::make_bars_hlcv;

    #[test]
    fn empty_input_is_empty() {
        assert!(vwap(&[]).is_empty());
    }

    #[test]
    fn single_bar_is_typical_price() {
        let bars = make_bars_hlcv(&[(12.0, 8.0, 10.0, 500.0)]);
        let out = vwap(&bars);
        assert!((out[0] - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn weights_by_volume() {
        // typical prices 10 and 20; volumes 100 and 300
        // vwap = (10*100 + 20*300) / 400 = 17.5
        let bars = make_bars_hlcv(&[(10.0, 10.0, 10.0, 100.0), (20.0, 20.0, 20.0, 300.0)]);
        let out = vwap(&bars);
        assert!((out[1] - 17.5).abs() < 1e-9);
    }

    #[test]
    fn zero_volume_falls_back_to_typical() {
        let bars = make_bars_hlcv(&[(10.0, 10.0, 10.0, 0.0), (20.0, 20.0, 20.0, 0.0)]);
        let out = vwap(&bars);
        assert!((out[0] - 10.0).abs() < f64::EPSILON);
        assert!((out[1] - 20.0).abs() < f64::EPSILON);
    }
}
