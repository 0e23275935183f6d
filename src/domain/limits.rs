//! Risk limits, alerts, and the metrics set the risk engine computes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Process-wide risk configuration. One effective set applies to every
/// validation call; hot-swappable through the risk engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Largest single position, percent of portfolio value.
    pub max_position_size_pct: f64,
    pub max_leverage: f64,
    pub max_drawdown_pct: f64,
    pub max_daily_loss_pct: f64,
    /// Ceiling on average pairwise position correlation.
    pub max_correlation: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub max_open_positions: usize,
    pub max_risk_per_trade_pct: f64,
    pub min_margin_level_pct: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        RiskLimits {
            max_position_size_pct: 20.0,
            max_leverage: 3.0,
            max_drawdown_pct: 20.0,
            max_daily_loss_pct: 5.0,
            max_correlation: 0.8,
            stop_loss_pct: 5.0,
            take_profit_pct: 10.0,
            max_open_positions: 10,
            max_risk_per_trade_pct: 2.0,
            min_margin_level_pct: 150.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Low,
    Medium,
    High,
}

/// A threshold breach raised by a monitoring pass. Each pass regenerates the
/// full alert set; alerts are not accumulated across passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub id: u64,
    pub severity: AlertSeverity,
    pub level: AlertLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub symbol: Option<String>,
    pub value: Option<f64>,
    pub threshold: Option<f64>,
}

/// Metrics recomputed on every monitoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub total_exposure: f64,
    pub leverage: f64,
    /// Percent of equity tied up as margin.
    pub margin_utilization_pct: f64,
    pub var_95: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    /// Pairwise position correlations (symbol, symbol, coefficient).
    pub correlations: Vec<(String, String, f64)>,
    pub diversification_ratio: f64,
    /// Weighted composite, 0 (idle) to 100 (limits fully consumed).
    pub risk_score: f64,
}
