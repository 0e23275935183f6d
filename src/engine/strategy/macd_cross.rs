//! MACD signal-line crossover strategy.
//!
//! Buys when the MACD line crosses above its signal line (histogram turns
//! positive), sells on the opposite cross. Parameters: `fast` (12), `slow`
//! (26), `signal` (9).

use crate::domain::error::EngineError;
use crate::domain::indicator::macd;
use crate::domain::market::{PriceBar, closes};
use crate::domain::signal::{Signal, SignalKind};

use super::ma_crossover::protective_levels;
use super::{Strategy, StrategyConfig};

const DEFAULT_FAST: f64 = 12.0;
const DEFAULT_SLOW: f64 = 26.0;
const DEFAULT_SIGNAL: f64 = 9.0;

pub struct MacdCross {
    config: StrategyConfig,
}

impl MacdCross {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    fn periods(&self) -> (usize, usize, usize) {
        (
            self.config.param_or("fast", DEFAULT_FAST) as usize,
            self.config.param_or("slow", DEFAULT_SLOW) as usize,
            self.config.param_or("signal", DEFAULT_SIGNAL) as usize,
        )
    }
}

impl Default for MacdCross {
    fn default() -> Self {
        Self::new(StrategyConfig::new("macd_cross"))
    }
}

impl Strategy for MacdCross {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn min_lookback(&self) -> usize {
        let (_, slow, signal) = self.periods();
        slow + signal
    }

    fn execute(&self, bars: &[PriceBar]) -> Result<Vec<Signal>, EngineError> {
        let (fast, slow, signal_period) = self.periods();
        let prices = closes(bars);
        let series = macd(&prices, fast, slow, signal_period);
        if series.len() < 2 {
            return Ok(Vec::new());
        }

        let prev = &series[series.len() - 2];
        let now = &series[series.len() - 1];

        let kind = if prev.histogram <= 0.0 && now.histogram > 0.0 {
            SignalKind::Buy
        } else if prev.histogram >= 0.0 && now.histogram < 0.0 {
            SignalKind::Sell
        } else {
            return Ok(Vec::new());
        };

        let last = &bars[bars.len() - 1];
        let momentum_pct = (now.histogram / last.close).abs() * 100.0;
        let strength = (55.0 + momentum_pct * 200.0).min(100.0);
        let (stop_loss, take_profit) = protective_levels(&self.config, kind, last.close);

        Ok(vec![Signal {
            symbol: last.symbol.clone(),
            kind,
            strength,
            confidence: 0.6,
            price: last.close,
            timestamp: last.timestamp,
            strategy: self.config.name.clone(),
            reason: format!(
                "MACD({fast},{slow},{signal_period}) histogram crossed {}",
                if kind == SignalKind::Buy { "positive" } else { "negative" },
            ),
            stop_loss,
            take_profit,
        }])
    }

    fn validate_config(&self, config: &StrategyConfig) -> bool {
        let fast = config.param_or("fast", DEFAULT_FAST);
        let slow = config.param_or("slow", DEFAULT_SLOW);
        let signal = config.param_or("signal", DEFAULT_SIGNAL);
        fast >= 1.0 && slow > fast && signal >= 1.0
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
