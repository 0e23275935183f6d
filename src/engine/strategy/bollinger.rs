//! Bollinger band touch strategy.
//!
//! Buys when the close touches or pierces the lower band, sells at the upper
//! band. Parameters: `period` (default 20), `std_dev` (default 2).

use crate::domain::error::EngineError;
use crate::domain::indicator::bollinger_bands;
use crate::domain::market::{PriceBar, closes};
use crate::domain::signal::{Signal, SignalKind};

use super::ma_crossover::protective_levels;
use super::{Strategy, StrategyConfig};

const DEFAULT_PERIOD: f64 = 20.0;
const DEFAULT_STD_DEV: f64 = 2.0;

pub struct BollingerTouch {
    config: StrategyConfig,
}

impl BollingerTouch {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    fn period(&self) -> usize {
        self.config.param_or("period", DEFAULT_PERIOD) as usize
    }
}

impl Default for BollingerTouch {
    fn default() -> Self {
        Self::new(StrategyConfig::new("bollinger_touch"))
    }
}

impl Strategy for BollingerTouch {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn min_lookback(&self) -> usize {
        self.period()
    }

    fn execute(&self, bars: &[PriceBar]) -> Result<Vec<Signal>, EngineError> {
        let prices = closes(bars);
        let std_dev = self.config.param_or("std_dev", DEFAULT_STD_DEV);
        let bands = bollinger_bands(&prices, self.period(), std_dev);
        let Some(band) = bands.last() else {
            return Ok(Vec::new());
        };

        let last = &bars[bars.len() - 1];
        let close = last.close;

        let kind = if close <= band.lower {
            SignalKind::Buy
        } else if close >= band.upper {
            SignalKind::Sell
        } else {
            return Ok(Vec::new());
        };

        let band_width = band.upper - band.lower;
        let overshoot = match kind {
            SignalKind::Buy => band.lower - close,
            _ => close - band.upper,
        };
        let strength = if band_width > 0.0 {
            (60.0 + (overshoot / band_width) * 100.0).min(100.0)
        } else {
            60.0
        };
        let (stop_loss, take_profit) = protective_levels(&self.config, kind, close);

        Ok(vec![Signal {
            symbol: last.symbol.clone(),
            kind,
            strength,
            confidence: 0.55,
            price: close,
            timestamp: last.timestamp,
            strategy: self.config.name.clone(),
            reason: format!(
                "close {close:.2} {} {} band {:.2}",
                if kind == SignalKind::Buy { "at or below" } else { "at or above" },
                if kind == SignalKind::Buy { "lower" } else { "upper" },
                if kind == SignalKind::Buy { band.lower } else { band.upper },
            ),
            stop_loss,
            take_profit,
        }])
    }

    fn validate_config(&self, config: &StrategyConfig) -> bool {
        config.param_or("period", DEFAULT_PERIOD) >= 2.0
            && config.param_or("std_dev", DEFAULT_STD_DEV) > 0.0
    }

    fn set_config(&mut self, config: StrategyConfig) -> Result<(), EngineError> {
        if !self.validate_config(&config) {
            return Err(EngineError::validation(format!(
                "invalid configuration for strategy '{}'",
                config.name
            )));
        }
        self.config = config;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::make_bars_hlc;

    fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        let spec: Vec<(f64, f64, f64)> = closes.iter().map(|&c| (c, c, c)).collect();
        make_bars_hlc(&spec)
    }

    fn short_period() -> BollingerTouch {
        BollingerTouch::new(
            StrategyConfig::new("bollinger_touch")
                .with_param("period", 5.0)
                .with_param("std_dev", 1.5),
        )
    }

    #[test]
    fn plunge_below_lower_band_emits_buy() {
        let s = short_period();
        let bars = bars_from_closes(&[100.0, 101.0, 99.0, 100.0, 101.0, 100.0, 90.0]);
        let signals = s.execute(&bars).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Buy);
    }

    #[test]
    fn spike_above_upper_band_emits_sell() {
        let s = short_period();
        let bars = bars_from_closes(&[100.0, 101.0, 99.0, 100.0, 101.0, 100.0, 112.0]);
        let signals = s.execute(&bars).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Sell);
    }

    #[test]
    fn price_inside_bands_is_silent() {
        let s = short_period();
        let bars = bars_from_closes(&[100.0, 101.0, 99.0, 100.0, 101.0, 100.0, 100.5]);
        assert!(s.execute(&bars).unwrap().is_empty());
    }

    #[test]
    fn insufficient_bars_is_empty() {
        let s = short_period();
        let bars = bars_from_closes(&[100.0, 101.0]);
        assert!(s.execute(&bars).unwrap().is_empty());
    }
}
