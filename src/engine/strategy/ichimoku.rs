//! Ichimoku cloud strategy.
//!
//! Buys when price closes above the cloud with the tenkan line above the
//! kijun line, sells on the bearish mirror. Parameters: `tenkan` (9),
//! `kijun` (26), `senkou_b` (52).

use crate::domain::error::EngineError;
use crate::domain::indicator::ichimoku;
use crate::domain::market::PriceBar;
use crate::domain::signal::{Signal, SignalKind};

use super::ma_crossover::protective_levels;
use super::{Strategy, StrategyConfig};

const DEFAULT_TENKAN: f64 = 9.0;
const DEFAULT_KIJUN: f64 = 26.0;
const DEFAULT_SENKOU_B: f64 = 52.0;

pub struct IchimokuCloud {
    config: StrategyConfig,
}

impl IchimokuCloud {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    fn periods(&self) -> (usize, usize, usize) {
        (
            self.config.param_or("tenkan", DEFAULT_TENKAN) as usize,
            self.config.param_or("kijun", DEFAULT_KIJUN) as usize,
            self.config.param_or("senkou_b", DEFAULT_SENKOU_B) as usize,
        )
    }
}

impl Default for IchimokuCloud {
    fn default() -> Self {
        Self::new(StrategyConfig::new("ichimoku_cloud"))
    }
}

impl Strategy for IchimokuCloud {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn min_lookback(&self) -> usize {
        let (_, _, senkou_b) = self.periods();
        senkou_b
    }

    fn execute(&self, bars: &[PriceBar]) -> Result<Vec<Signal>, EngineError> {
        let (tenkan_p, kijun_p, senkou_b_p) = self.periods();
        let points = ichimoku(bars, tenkan_p, kijun_p, senkou_b_p);
        let Some(point) = points.last() else {
            return Ok(Vec::new());
        };

        let last = &bars[bars.len() - 1];
        let close = last.close;
        let cloud_top = point.senkou_a.max(point.senkou_b);
        let cloud_bottom = point.senkou_a.min(point.senkou_b);

        let kind = if close > cloud_top && point.tenkan > point.kijun {
            SignalKind::Buy
        } else if close < cloud_bottom && point.tenkan < point.kijun {
            SignalKind::Sell
        } else {
            return Ok(Vec::new());
        };

        let cloud_distance_pct = match kind {
            SignalKind::Buy => (close - cloud_top) / close * 100.0,
            _ => (cloud_bottom - close) / close * 100.0,
        };
        let strength = (60.0 + cloud_distance_pct * 10.0).min(100.0);
        let (stop_loss, take_profit) = protective_levels(&self.config, kind, close);

        Ok(vec![Signal {
            symbol: last.symbol.clone(),
            kind,
            strength,
            confidence: 0.65,
            price: close,
            timestamp: last.timestamp,
            strategy: self.config.name.clone(),
            reason: format!(
                "price {} cloud with tenkan {} kijun",
                if kind == SignalKind::Buy { "above" } else { "below" },
                if kind == SignalKind::Buy { "above" } else { "below" },
            ),
            stop_loss,
            take_profit,
        }])
    }

    fn validate_config(&self, config: &StrategyConfig) -> bool {
        let tenkan = config.param_or("tenkan", DEFAULT_TENKAN);
        let kijun = config.param_or("kijun", DEFAULT_KIJUN);
        let senkou_b = config.param_or("senkou_b", DEFAULT_SENKOU_B);
        tenkan >= 1.0 && kijun > tenkan && senkou_b >= kijun
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
