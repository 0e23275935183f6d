//! Moving-average crossover strategy.
//!
//! Emits a buy when the fast SMA crosses above the slow SMA on the final bar
//! of the window, and a sell on the opposite cross. Parameters: `fast_period`
//! (default 10), `slow_period` (default 30).

use crate::domain::error::EngineError;
use crate::domain::indicator::sma;
use crate::domain::market::{PriceBar, closes};
use crate::domain::signal::{Signal, SignalKind};

use super::{Strategy, StrategyConfig};

const DEFAULT_FAST: f64 = 10.0;
const DEFAULT_SLOW: f64 = 30.0;

pub struct MaCrossover {
    config: StrategyConfig,
}

impl MaCrossover {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    fn fast_period(&self) -> usize {
        self.config.param_or("fast_period", DEFAULT_FAST) as usize
    }

    fn slow_period(&self) -> usize {
        self.config.param_or("slow_period", DEFAULT_SLOW) as usize
    }
}

impl Default for MaCrossover {
    fn default() -> Self {
        Self::new(StrategyConfig::new("ma_crossover"))
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn min_lookback(&self) -> usize {
        // One extra bar so the previous relation of the averages is defined
        self.slow_period() + 1
    }

    fn execute(&self, bars: &[PriceBar]) -> Result<Vec<Signal>, EngineError> {
        if bars.len() < self.min_lookback() {
            return Ok(Vec::new());
        }

        let prices = closes(bars);
        let fast = sma(&prices, self.fast_period());
        let slow = sma(&prices, self.slow_period());
        if fast.len() < 2 || slow.len() < 2 {
            return Ok(Vec::new());
        }

        let (fast_prev, fast_now) = (fast[fast.len() - 2], fast[fast.len() - 1]);
        let (slow_prev, slow_now) = (slow[slow.len() - 2], slow[slow.len() - 1]);

        let kind = if fast_prev <= slow_prev && fast_now > slow_now {
            SignalKind::Buy
        } else if fast_prev >= slow_prev && fast_now < slow_now {
            SignalKind::Sell
        } else {
            return Ok(Vec::new());
        };

        let last = &bars[bars.len() - 1];
        let separation_pct = ((fast_now - slow_now) / slow_now).abs() * 100.0;
        let strength = (50.0 + separation_pct * 25.0).min(100.0);
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
                "SMA({}) crossed {} SMA({})",
                self.fast_period(),
                if kind == SignalKind::Buy { "above" } else { "below" },
                self.slow_period(),
            ),
            stop_loss,
            take_profit,
        }])
    }

    fn validate_config(&self, config: &StrategyConfig) -> bool {
        let fast = config.param_or("fast_period", DEFAULT_FAST);
        let slow = config.param_or("slow_period", DEFAULT_SLOW);
        fast >= 1.0 && slow > fast
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

/// Stop-loss and take-profit derived from the risk sub-block, relative to the
/// signal price. Hold signals carry neither.
pub(super) fn protective_levels(
    config: &StrategyConfig,
    kind: SignalKind,
    price: f64,
) -> (Option<f64>, Option<f64>) {
    let sl = config.risk.stop_loss_pct / 100.0;
    let tp = config.risk.take_profit_pct / 100.0;
    match kind {
        SignalKind::Buy => (Some(price * (1.0 - sl)), Some(price * (1.0 + tp))),
        SignalKind::Sell => (Some(price * (1.0 + sl)), Some(price * (1.0 - tp))),
        SignalKind::Hold => (None, None),
    }
}
