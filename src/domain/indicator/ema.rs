//! Exponential moving average.
//!
//! Seeded with the first price and smoothed with multiplier `2 / (period + 1)`
//! from the second element onward, so the output has the same length as the
//! input.

pub fn ema(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.is_empty() {
        return Vec::new();
    }
    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(prices.len());
    let mut current = prices[0];
    out.push(current);
    for &price in &prices[1..] {
        current = (price - current) * multiplier + current;
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty() {
        assert!(ema(&[], 5).is_empty());
        assert!(ema(&[1.0], 0).is_empty());
    }

    #[test]
    fn seeds_from_first_price() {
        let out = ema(&[10.0, 10.0, 10.0], 3);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| (v - 10.0).abs() < f64::EPSILON));
    }

    #[test]
    fn known_values_period_three() {
        // multiplier = 2/(3+1) = 0.5
        // [2] -> 2; (4-2)*0.5+2 = 3; (6-3)*0.5+3 = 4.5
        let out = ema(&[2.0, 4.0, 6.0], 3);
        assert!((out[0] - 2.0).abs() < f64::EPSILON);
        assert!((out[1] - 3.0).abs() < f64::EPSILON);
        assert!((out[2] - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn tracks_rising_series_below_price() {
        let prices: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let out = ema(&prices, 5);
        // EMA lags a monotone rise
        assert!(out.last().unwrap() < prices.last().unwrap());
        assert!(out.windows(2).all(|w| w[1] > w[0]));
    }
}
