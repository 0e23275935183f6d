//! INI configuration loader.
//!
//! Every key is optional; missing keys fall back to defaults, unparseable
//! values are a configuration error rather than a silent fallback.

use std::path::Path;

use configparser::ini::Ini;

use crate::domain::limits::RiskLimits;
use crate::engine::orders::CommissionSchedule;

use crate::domain::error::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioConfig {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub initial_cash: f64,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            id: "default".into(),
            owner: "local".into(),
            name: "paper".into(),
            initial_cash: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub portfolio: PortfolioConfig,
    pub limits: RiskLimits,
    pub commission: CommissionSchedule,
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let mut ini = Ini::new();
        ini.load(&path).map_err(|e| EngineError::ConfigParse {
            file: path.as_ref().display().to_string(),
            reason: e,
        })?;
        Self::from_ini(&ini)
    }

    pub fn from_str(content: &str) -> Result<Self, EngineError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|e| EngineError::ConfigParse {
                file: "<inline>".into(),
                reason: e,
            })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, EngineError> {
        let mut config = EngineConfig::default();

        if let Some(id) = ini.get("portfolio", "id") {
            config.portfolio.id = id;
        }
        if let Some(owner) = ini.get("portfolio", "owner") {
            config.portfolio.owner = owner;
        }
        if let Some(name) = ini.get("portfolio", "name") {
            config.portfolio.name = name;
        }
        config.portfolio.initial_cash = get_f64(
            ini,
            "portfolio",
            "initial_cash",
            config.portfolio.initial_cash,
        )?;
        if config.portfolio.initial_cash < 0.0 {
            return Err(EngineError::ConfigInvalid {
                section: "portfolio".into(),
                key: "initial_cash".into(),
                reason: "must be non-negative".into(),
            });
        }

        let limits = &mut config.limits;
        limits.max_position_size_pct =
            get_f64(ini, "risk", "max_position_size_pct", limits.max_position_size_pct)?;
        limits.max_leverage = get_f64(ini, "risk", "max_leverage", limits.max_leverage)?;
        limits.max_drawdown_pct = get_f64(ini, "risk", "max_drawdown_pct", limits.max_drawdown_pct)?;
        limits.max_daily_loss_pct =
            get_f64(ini, "risk", "max_daily_loss_pct", limits.max_daily_loss_pct)?;
        limits.max_correlation = get_f64(ini, "risk", "max_correlation", limits.max_correlation)?;
        limits.stop_loss_pct = get_f64(ini, "risk", "stop_loss_pct", limits.stop_loss_pct)?;
        limits.take_profit_pct = get_f64(ini, "risk", "take_profit_pct", limits.take_profit_pct)?;
        limits.max_open_positions =
            get_f64(ini, "risk", "max_open_positions", limits.max_open_positions as f64)? as usize;
        limits.max_risk_per_trade_pct =
            get_f64(ini, "risk", "max_risk_per_trade_pct", limits.max_risk_per_trade_pct)?;
        limits.min_margin_level_pct =
            get_f64(ini, "risk", "min_margin_level_pct", limits.min_margin_level_pct)?;

        let commission = &mut config.commission;
        commission.crypto_bps = get_f64(ini, "commission", "crypto_bps", commission.crypto_bps)?;
        commission.fx_bps = get_f64(ini, "commission", "fx_bps", commission.fx_bps)?;
        commission.equity_bps = get_f64(ini, "commission", "equity_bps", commission.equity_bps)?;
        commission.min_commission =
            get_f64(ini, "commission", "min_commission", commission.min_commission)?;

        Ok(config)
    }
}

fn get_f64(ini: &Ini, section: &str, key: &str, default: f64) -> Result<f64, EngineError> {
    match ini.getfloat(section, key) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(default),
        Err(reason) => Err(EngineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason,
        }),
    }
}
