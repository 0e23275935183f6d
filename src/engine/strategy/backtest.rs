//! Bar-by-bar paper backtest for a single strategy.
//!
//! The paper account holds at most one open position. An opposite signal
//! closes the open position before a new one is considered; position size is
//! the configured max position percentage of the running balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::error::EngineError;
use crate::domain::indicator::{mean, population_stddev};
use crate::domain::market::PriceBar;
use crate::domain::signal::SignalKind;

use super::Strategy;

/// One completed round trip of the paper account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperTrade {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub pnl: f64,
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub strategy: String,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_return_pct: f64,
    pub trade_count: usize,
    pub win_rate_pct: f64,
    pub max_drawdown_pct: f64,
    /// Mean over standard deviation of per-trade returns, unannualized.
    pub sharpe_ratio: f64,
    pub profit_factor: f64,
    pub trades: Vec<PaperTrade>,
}

struct OpenPaper {
    quantity: f64,
    entry_price: f64,
    entry_time: DateTime<Utc>,
}

/// Run `strategy` over the historical series starting from its minimum
/// lookback. A strategy failure on one bar is logged and that bar is skipped.
pub fn run_backtest(
    strategy: &dyn Strategy,
    bars: &[PriceBar],
    initial_balance: f64,
) -> Result<BacktestReport, EngineError> {
    if initial_balance <= 0.0 {
        return Err(EngineError::validation("initial balance must be positive"));
    }
    let lookback = strategy.min_lookback();
    if bars.len() <= lookback {
        let symbol = bars.first().map(|b| b.symbol.clone()).unwrap_or_default();
        return Err(EngineError::InsufficientData {
            symbol,
            bars: bars.len(),
            minimum: lookback + 1,
        });
    }

    let size_pct = strategy.config().risk.max_position_size_pct / 100.0;
    let mut balance = initial_balance;
    let mut open: Option<OpenPaper> = None;
    let mut trades: Vec<PaperTrade> = Vec::new();
    let mut peak_equity = initial_balance;
    let mut max_drawdown_pct = 0.0f64;

    for i in lookback..bars.len() {
        let window = &bars[..=i];
        let bar = &bars[i];

        let signals = match strategy.execute(window) {
            Ok(signals) => signals,
            Err(err) => {
                warn!(strategy = strategy.name(), error = %err, "backtest step failed");
                Vec::new()
            }
        };

        if let Some(signal) = signals.first() {
            match signal.kind {
                SignalKind::Sell => {
                    if let Some(position) = open.take() {
                        balance += close_paper(&mut trades, bar, position, signal.price);
                    }
                }
                SignalKind::Buy => {
                    if open.is_none() {
                        let quantity = balance * size_pct / signal.price;
                        if quantity > 0.0 {
                            open = Some(OpenPaper {
                                quantity,
                                entry_price: signal.price,
                                entry_time: signal.timestamp,
                            });
                        }
                    }
                }
                SignalKind::Hold => {}
            }
        }

        let equity = balance
            + open
                .as_ref()
                .map(|p| p.quantity * (bar.close - p.entry_price))
                .unwrap_or(0.0);
        peak_equity = peak_equity.max(equity);
        if peak_equity > 0.0 {
            let drawdown = (peak_equity - equity) / peak_equity * 100.0;
            max_drawdown_pct = max_drawdown_pct.max(drawdown);
        }
    }

    // Liquidate anything still open at the final close
    if let Some(position) = open.take() {
        if let Some(last) = bars.last() {
            balance += close_paper(&mut trades, last, position, last.close);
        }
    }

    let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
    let wins = trades.iter().filter(|t| t.pnl > 0.0).count();
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| -t.pnl)
        .sum();

    let win_rate_pct = if trades.is_empty() {
        0.0
    } else {
        wins as f64 / trades.len() as f64 * 100.0
    };
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };
    let sharpe_ratio = {
        let sd = population_stddev(&returns);
        if returns.is_empty() || sd == 0.0 {
            0.0
        } else {
            mean(&returns) / sd
        }
    };

    Ok(BacktestReport {
        strategy: strategy.name().to_string(),
        initial_balance,
        final_balance: balance,
        total_return_pct: (balance - initial_balance) / initial_balance * 100.0,
        trade_count: trades.len(),
        win_rate_pct,
        max_drawdown_pct,
        sharpe_ratio,
        profit_factor,
        trades,
    })
}

fn close_paper(
    trades: &mut Vec<PaperTrade>,
    bar: &PriceBar,
    position: OpenPaper,
    exit_price: f64,
) -> f64 {
    let pnl = position.quantity * (exit_price - position.entry_price);
    trades.push(PaperTrade {
        symbol: bar.symbol.clone(),
        quantity: position.quantity,
        entry_price: position.entry_price,
        exit_price,
        entry_time: position.entry_time,
        exit_time: bar.timestamp,
        pnl,
        return_pct: (exit_price - position.entry_price) / position.entry_price * 100.0,
    });
    pnl
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::make_bars_hlc;
    use crate::engine::strategy::{MaCrossover, StrategyConfig};

    fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        let spec: Vec<(f64, f64, f64)> = closes.iter().map(|&c| (c, c, c)).collect();
        make_bars_hlc(&spec)
    }

    fn crossover() -> MaCrossover {
        MaCrossover::new(
            StrategyConfig::new("ma_crossover")
                .with_param("fast_period", 2.0)
                .with_param("slow_period", 4.0),
        )
    }

    #[test]
    fn insufficient_history_is_an_error() {
        let s = crossover();
        let bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        let err = run_backtest(&s, &bars, 10_000.0).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { .. }));
    }

    #[test]
    fn round_trip_profits_on_a_rally() {
        let s = crossover();
        // Slide, sharp rally (buy cross), gentle fade (sell cross above entry)
        let closes = [
            10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 12.0, 14.0, 16.0, 18.0, 20.0, 19.0, 18.0,
        ];
        let bars = bars_from_closes(&closes);
        let report = run_backtest(&s, &bars, 10_000.0).unwrap();

        assert!(report.trade_count >= 1);
        assert!(report.final_balance > report.initial_balance);
        assert!(report.total_return_pct > 0.0);
        assert!(report.win_rate_pct > 0.0);
    }

    #[test]
    fn never_more_than_one_open_position() {
        let s = crossover();
        let closes = [
            10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 12.0, 14.0, 16.0, 18.0, 20.0, 19.0, 18.0,
        ];
        let bars = bars_from_closes(&closes);
        let report = run_backtest(&s, &bars, 10_000.0).unwrap();

        // Entries and exits alternate, so trades never overlap in time
        for pair in report.trades.windows(2) {
            assert!(pair[0].exit_time <= pair[1].entry_time);
        }
    }

    #[test]
    fn quiet_series_reports_zero_trades() {
        let s = crossover();
        let bars = bars_from_closes(&[10.0; 12]);
        let report = run_backtest(&s, &bars, 10_000.0).unwrap();
        assert_eq!(report.trade_count, 0);
        assert_eq!(report.win_rate_pct, 0.0);
        assert_eq!(report.profit_factor, 0.0);
        assert_eq!(report.final_balance, report.initial_balance);
    }
}
