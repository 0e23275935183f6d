//! Strategy registry, execution, and signal consolidation.
//!
//! Strategies are pure over an immutable bar window. The engine isolates
//! per-strategy failures: a failing strategy logs and contributes no signals,
//! it never aborts a multi-strategy run.

pub mod backtest;
pub mod bollinger;
pub mod ichimoku;
pub mod ma_crossover;
pub mod macd_cross;
pub mod rsi;

pub use backtest::{BacktestReport, PaperTrade, run_backtest};
pub use bollinger::BollingerTouch;
pub use ichimoku::IchimokuCloud;
pub use ma_crossover::MaCrossover;
pub use macd_cross::MacdCross;
pub use rsi::RsiThreshold;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::error::EngineError;
use crate::domain::market::PriceBar;
use crate::domain::signal::{ConsolidatedSignal, Signal, SignalKind};
use crate::engine::events::EventBus;

/// Per-strategy risk sub-block, percentages of portfolio value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub max_position_size_pct: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub max_drawdown_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size_pct: 10.0,
            stop_loss_pct: 2.0,
            take_profit_pct: 4.0,
            max_drawdown_pct: 20.0,
        }
    }
}

/// Configuration owned by a strategy instance. Mutated only through
/// [`StrategyEngine::update_config`], which lets the strategy validate the
/// incoming values first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub params: HashMap<String, f64>,
    pub enabled: bool,
    pub risk: RiskConfig,
}

impl StrategyConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: HashMap::new(),
            enabled: true,
            risk: RiskConfig::default(),
        }
    }

    pub fn with_param(mut self, key: &str, value: f64) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    /// Parameter lookup with a strategy-provided default.
    pub fn param_or(&self, key: &str, default: f64) -> f64 {
        self.params.get(key).copied().unwrap_or(default)
    }
}

/// Capability contract every shipped strategy variant implements.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    fn config(&self) -> &StrategyConfig;

    /// Fewest bars `execute` needs to produce a meaningful signal.
    fn min_lookback(&self) -> usize;

    /// Evaluate the window and emit zero or more signals for its final bar.
    fn execute(&self, bars: &[PriceBar]) -> Result<Vec<Signal>, EngineError>;

    /// Check a candidate configuration without applying it.
    fn validate_config(&self, config: &StrategyConfig) -> bool;

    fn set_config(&mut self, config: StrategyConfig) -> Result<(), EngineError>;
}

/// Registry of strategies keyed by name, with synchronous signal fan-out.
pub struct StrategyEngine {
    strategies: Mutex<BTreeMap<String, Box<dyn Strategy>>>,
    signal_bus: Arc<EventBus<Signal>>,
}

impl StrategyEngine {
    pub fn new(signal_bus: Arc<EventBus<Signal>>) -> Self {
        Self {
            strategies: Mutex::new(BTreeMap::new()),
            signal_bus,
        }
    }

    fn registry(&self) -> MutexGuard<'_, BTreeMap<String, Box<dyn Strategy>>> {
        self.strategies.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a strategy under its own name, replacing any previous entry.
    pub fn register(&self, strategy: Box<dyn Strategy>) {
        let name = strategy.name().to_string();
        debug!(strategy = %name, "registering strategy");
        self.registry().insert(name, strategy);
    }

    /// Returns false when no strategy of that name was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.registry().remove(name).is_some()
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), EngineError> {
        let mut registry = self.registry();
        let strategy = registry
            .get_mut(name)
            .ok_or_else(|| EngineError::not_found("strategy", name))?;
        let mut config = strategy.config().clone();
        config.enabled = enabled;
        strategy.set_config(config)
    }

    /// Replace a strategy's configuration after the strategy validates it.
    pub fn update_config(&self, name: &str, config: StrategyConfig) -> Result<(), EngineError> {
        let mut registry = self.registry();
        let strategy = registry
            .get_mut(name)
            .ok_or_else(|| EngineError::not_found("strategy", name))?;
        strategy.set_config(config)
    }

    pub fn strategy_names(&self) -> Vec<String> {
        self.registry().keys().cloned().collect()
    }

    /// Run one strategy by name. Disabled strategies yield an empty list;
    /// an unregistered name is an error; an internal strategy failure is
    /// logged and degrades to an empty list.
    pub fn run_strategy(&self, name: &str, bars: &[PriceBar]) -> Result<Vec<Signal>, EngineError> {
        let registry = self.registry();
        let strategy = registry
            .get(name)
            .ok_or_else(|| EngineError::not_found("strategy", name))?;

        if !strategy.config().enabled {
            return Ok(Vec::new());
        }

        match strategy.execute(bars) {
            Ok(signals) => {
                for signal in &signals {
                    self.signal_bus.publish(signal);
                }
                Ok(signals)
            }
            Err(err) => {
                warn!(strategy = name, error = %err, "strategy execution failed");
                Ok(Vec::new())
            }
        }
    }

    /// Run every enabled strategy over the window and consolidate the result
    /// per symbol.
    pub fn run_all_active(&self, bars: &[PriceBar]) -> Vec<ConsolidatedSignal> {
        let mut raw = Vec::new();
        {
            let registry = self.registry();
            for (name, strategy) in registry.iter() {
                if !strategy.config().enabled {
                    continue;
                }
                match strategy.execute(bars) {
                    Ok(signals) => raw.extend(signals),
                    Err(err) => {
                        warn!(strategy = %name, error = %err, "strategy execution failed");
                    }
                }
            }
        }
        for signal in &raw {
            self.signal_bus.publish(signal);
        }
        consolidate(raw)
    }
}

/// Merge per-symbol signals into one opinion each.
///
/// A lone signal passes through unchanged. Multiple signals vote by count on
/// the direction (ties resolve to hold), confidence is the strength-weighted
/// average, strength the plain average, and the reason names every
/// contributing strategy.
pub fn consolidate(signals: Vec<Signal>) -> Vec<ConsolidatedSignal> {
    let mut by_symbol: BTreeMap<String, Vec<Signal>> = BTreeMap::new();
    for signal in signals {
        by_symbol.entry(signal.symbol.clone()).or_default().push(signal);
    }

    let mut out = Vec::new();
    for (symbol, group) in by_symbol {
        if group.len() == 1 {
            let only = group.into_iter().next();
            if let Some(signal) = only {
                out.push(ConsolidatedSignal::from(signal));
            }
            continue;
        }

        let mut buys = 0usize;
        let mut sells = 0usize;
        let mut holds = 0usize;
        for signal in &group {
            match signal.kind {
                SignalKind::Buy => buys += 1,
                SignalKind::Sell => sells += 1,
                SignalKind::Hold => holds += 1,
            }
        }
        let kind = if buys > sells && buys > holds {
            SignalKind::Buy
        } else if sells > buys && sells > holds {
            SignalKind::Sell
        } else {
            SignalKind::Hold
        };

        let strength_sum: f64 = group.iter().map(|s| s.strength).sum();
        let confidence = if strength_sum > 0.0 {
            group.iter().map(|s| s.confidence * s.strength).sum::<f64>() / strength_sum
        } else {
            group.iter().map(|s| s.confidence).sum::<f64>() / group.len() as f64
        };
        let strength = strength_sum / group.len() as f64;

        let contributors: Vec<String> = group.iter().map(|s| s.strategy.clone()).collect();
        let reason = format!("consolidated from {}", contributors.join(", "));
        let last = &group[group.len() - 1];

        out.push(ConsolidatedSignal {
            symbol,
            kind,
            strength,
            confidence,
            price: last.price,
            timestamp: last.timestamp,
            contributors,
            reason,
        });
    }
    out
}
