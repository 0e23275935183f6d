//! RSI (Relative Strength Index), Wilder smoothing.
//!
//! First value is computed from the simple average of the first `period`
//! gains/losses; subsequent averages use
//! `avg = (prev_avg * (period - 1) + current) / period`.
//! `RSI = 100 - 100 / (1 + avg_gain / avg_loss)`; a zero average loss is a
//! defined edge case yielding 100.
//!
//! Needs `period + 1` prices for the first value; output length is
//! `len - period`.

pub fn rsi(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period + 1 {
        return Vec::new();
    }

    let gains: Vec<f64> = prices
        .windows(2)
        .map(|w| (w[1] - w[0]).max(0.0))
        .collect();
    let losses: Vec<f64> = prices
        .windows(2)
        .map(|w| (w[0] - w[1]).max(0.0))
        .collect();

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(prices.len() - period);
    out.push(rsi_value(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        out.push(rsi_value(avg_gain, avg_loss));
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_input_is_empty() {
        let prices: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
        assert!(rsi(&prices, 14).is_empty());
        assert!(rsi(&[], 14).is_empty());
        assert!(rsi(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn all_gains_is_hundred() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let out = rsi(&prices, 14);
        assert_eq!(out.len(), 6);
        assert!(out.iter().all(|v| (v - 100.0).abs() < f64::EPSILON));
    }

    #[test]
    fn all_losses_is_zero() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let out = rsi(&prices, 14);
        assert!(out.iter().all(|v| v.abs() < f64::EPSILON));
    }

    #[test]
    fn stays_in_range() {
        let prices: Vec<f64> = (0..40)
            .map(|i| 100.0 + ((i * 7) % 11) as f64 - 5.0)
            .collect();
        let out = rsi(&prices, 14);
        assert_eq!(out.len(), prices.len() - 14);
        assert!(out.iter().all(|&v| (0.0..=100.0).contains(&v)));
    }

    #[test]
    fn hand_computed_period_two() {
        // prices: 10, 11, 10, 12
        // gains: 1, 0, 2; losses: 0, 1, 0
        // first avg (period 2): gain (1+0)/2 = 0.5, loss (0+1)/2 = 0.5 -> RSI 50
        // next: gain (0.5*1 + 2)/2 = 1.25, loss (0.5*1 + 0)/2 = 0.25
        //       RS = 5 -> RSI = 100 - 100/6 = 83.333...
        let out = rsi(&[10.0, 11.0, 10.0, 12.0], 2);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 50.0).abs() < 1e-9);
        assert!((out[1] - (100.0 - 100.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn bullish_fixture_is_above_fifty() {
        let prices = [
            44.0, 44.25, 44.5, 43.75, 44.5, 44.25, 44.75, 45.25, 45.5, 45.25, 45.5, 46.0, 46.25,
            46.0, 46.5,
        ];
        let out = rsi(&prices, 14);
        assert_eq!(out.len(), 1);
        assert!(out[0] > 50.0 && out[0] < 100.0);
    }
}
