//! RSI threshold strategy.
//!
//! Buys when RSI drops below the oversold bound, sells when it rises above
//! the overbought bound. Parameters: `period` (default 14), `oversold`
//! (default 30), `overbought` (default 70).

use crate::domain::error::EngineError;
use crate::domain::indicator::rsi;
use crate::domain::market::{PriceBar, closes};
use crate::domain::signal::{Signal, SignalKind};

use super::ma_crossover::protective_levels;
use super::{Strategy, StrategyConfig};

const DEFAULT_PERIOD: f64 = 14.0;
const DEFAULT_OVERSOLD: f64 = 30.0;
const DEFAULT_OVERBOUGHT: f64 = 70.0;

pub struct RsiThreshold {
    config: StrategyConfig,
}

impl RsiThreshold {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    fn period(&self) -> usize {
        self.config.param_or("period", DEFAULT_PERIOD) as usize
    }
}

impl Default for RsiThreshold {
    fn default() -> Self {
        Self::new(StrategyConfig::new("rsi_threshold"))
    }
}

impl Strategy for RsiThreshold {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn min_lookback(&self) -> usize {
        self.period() + 1
    }

    fn execute(&self, bars: &[PriceBar]) -> Result<Vec<Signal>, EngineError> {
        let prices = closes(bars);
        let values = rsi(&prices, self.period());
        let Some(&current) = values.last() else {
            return Ok(Vec::new());
        };

        let oversold = self.config.param_or("oversold", DEFAULT_OVERSOLD);
        let overbought = self.config.param_or("overbought", DEFAULT_OVERBOUGHT);

        let (kind, distance) = if current < oversold {
            (SignalKind::Buy, oversold - current)
        } else if current > overbought {
            (SignalKind::Sell, current - overbought)
        } else {
            return Ok(Vec::new());
        };

        let last = &bars[bars.len() - 1];
        // Deeper into the extreme zone reads as a stronger signal
        let strength = (50.0 + distance * 1.5).min(100.0);
        let (stop_loss, take_profit) = protective_levels(&self.config, kind, last.close);

        Ok(vec![Signal {
            symbol: last.symbol.clone(),
            kind,
            strength,
            confidence: 0.55 + (distance / 100.0).min(0.3),
            price: last.close,
            timestamp: last.timestamp,
            strategy: self.config.name.clone(),
            reason: format!("RSI({}) at {current:.1}", self.period()),
            stop_loss,
            take_profit,
        }])
    }

    fn validate_config(&self, config: &StrategyConfig) -> bool {
        let period = config.param_or("period", DEFAULT_PERIOD);
        let oversold = config.param_or("oversold", DEFAULT_OVERSOLD);
        let overbought = config.param_or("overbought", DEFAULT_OVERBOUGHT);
        period >= 2.0 && oversold > 0.0 && overbought < 100.0 && oversold < overbought
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

    fn short_period() -> RsiThreshold {
        RsiThreshold::new(StrategyConfig::new("rsi_threshold").with_param("period", 3.0))
    }

    #[test]
    fn relentless_decline_emits_buy() {
        let s = short_period();
        let bars = bars_from_closes(&[100.0, 98.0, 96.0, 94.0, 92.0, 90.0]);
        let signals = s.execute(&bars).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Buy);
    }

    #[test]
    fn relentless_rally_emits_sell() {
        let s = short_period();
        let bars = bars_from_closes(&[100.0, 102.0, 104.0, 106.0, 108.0, 110.0]);
        let signals = s.execute(&bars).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Sell);
    }

    #[test]
    fn neutral_rsi_is_silent() {
        let s = short_period();
        let bars = bars_from_closes(&[100.0, 101.0, 100.0, 101.0, 100.0, 101.0]);
        assert!(s.execute(&bars).unwrap().is_empty());
    }

    #[test]
    fn insufficient_bars_is_empty() {
        let s = short_period();
        let bars = bars_from_closes(&[100.0, 99.0]);
        assert!(s.execute(&bars).unwrap().is_empty());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let mut s = RsiThreshold::default();
        let bad = StrategyConfig::new("rsi_threshold")
            .with_param("oversold", 80.0)
            .with_param("overbought", 20.0);
        assert!(s.set_config(bad).is_err());
    }
}
