//! ATR (Average True Range), Wilder smoothing.
//!
//! True range needs a previous close, so the first `period` true ranges come
//! from bars 1..=period; output length is `len - period`.

use crate::domain::market::PriceBar;

pub fn atr(bars: &[PriceBar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period + 1 {
        return Vec::new();
    }

    let true_ranges: Vec<f64> = bars
        .windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .collect();

    let mut current = true_ranges[..period].iter().sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(true_ranges.len() - period + 1);
    out.push(current);

    for &tr in &true_ranges[period..] {
        current = (current * (period - 1) as f64 + tr) / period as f64;
        out.push(current);
    }

    out
}
