//! Property tests for the indicator library contracts.

mod common;

use proptest::prelude::*;
use quantdesk::domain::indicator::{
    atr, bollinger_bands, ema, macd, rsi, sma, stochastic, williams_r,
};

use common::hourly_bars;

proptest! {
    #[test]
    fn price_indicators_are_empty_on_short_input(
        prices in prop::collection::vec(1.0f64..1_000.0, 0..14),
        period in 14usize..30,
    ) {
        prop_assert!(sma(&prices, period).is_empty());
        prop_assert!(rsi(&prices, period).is_empty());
        prop_assert!(bollinger_bands(&prices, period, 2.0).is_empty());
        // The MACD slow period alone exceeds the input length
        prop_assert!(macd(&prices, 12, 26, 9).is_empty());
    }

    #[test]
    fn ema_covers_the_whole_series(
        prices in prop::collection::vec(1.0f64..1_000.0, 1..100),
        period in 2usize..20,
    ) {
        prop_assert_eq!(ema(&prices, period).len(), prices.len());
    }

    #[test]
    fn rsi_stays_bounded(
        prices in prop::collection::vec(1.0f64..1_000.0, 15..60),
    ) {
        for value in rsi(&prices, 14) {
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn macd_histogram_is_line_minus_signal(
        prices in prop::collection::vec(1.0f64..1_000.0, 30..80),
    ) {
        for point in macd(&prices, 12, 26, 9) {
            prop_assert!((point.histogram - (point.macd - point.signal)).abs() < 1e-9);
        }
    }

    #[test]
    fn bollinger_bands_bracket_the_middle(
        prices in prop::collection::vec(1.0f64..1_000.0, 20..60),
    ) {
        for band in bollinger_bands(&prices, 20, 2.0) {
            prop_assert!(band.lower <= band.middle + 1e-9);
            prop_assert!(band.middle <= band.upper + 1e-9);
        }
    }

    #[test]
    fn bar_indicators_are_empty_on_short_input(
        closes in prop::collection::vec(10.0f64..1_000.0, 0..10),
    ) {
        let bars = hourly_bars("TEST", &closes);
        prop_assert!(atr(&bars, 14).is_empty());
        prop_assert!(stochastic(&bars, 14, 3).is_empty());
        prop_assert!(williams_r(&bars, 14).is_empty());
    }

    #[test]
    fn oscillators_stay_in_range(
        closes in prop::collection::vec(10.0f64..1_000.0, 20..60),
    ) {
        let bars = hourly_bars("TEST", &closes);
        for point in stochastic(&bars, 14, 3) {
            prop_assert!((0.0..=100.0).contains(&point.k));
            prop_assert!((0.0..=100.0).contains(&point.d));
        }
        for value in williams_r(&bars, 14) {
            prop_assert!((-100.0..=0.0).contains(&value));
        }
    }
}
