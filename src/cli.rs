//! CLI definition and dispatch.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::config::EngineConfig;
use crate::adapters::csv_feed::CsvFeed;
use crate::adapters::memory_store::MemoryStore;
use crate::adapters::sim_exchange::SimExchange;
use crate::domain::error::EngineError;
use crate::domain::market::PriceBar;
use crate::domain::signal::SignalKind;
use crate::engine::Engine;
use crate::engine::orders::OrderRequest;
use crate::engine::strategy::{
    BollingerTouch, IchimokuCloud, MaCrossover, MacdCross, RsiThreshold, Strategy, StrategyConfig,
    run_backtest,
};
use crate::ports::market_data::MarketDataPort;

#[derive(Parser, Debug)]
#[command(name = "quantdesk", about = "Simulated trading engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest one strategy over historical CSV data
    Backtest {
        /// Directory of <SYMBOL>.csv files
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: String,
        /// One of: ma_crossover, rsi_threshold, macd_cross, bollinger_touch, ichimoku_cloud
        #[arg(short, long)]
        strategy: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// One-shot multi-strategy signal run with consolidation
    Signals {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Paper-trade a strategy through the full engine over a CSV window
    Paper {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(short, long)]
        strategy: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for the symbols under a data directory
    Info {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            data,
            symbol,
            strategy,
            config,
            start,
            end,
        } => run_backtest_cmd(&data, &symbol, &strategy, config.as_ref(), start, end),
        Command::Signals {
            data,
            symbol,
            config,
        } => run_signals(&data, &symbol, config.as_ref()),
        Command::Paper {
            data,
            symbol,
            strategy,
            config,
        } => run_paper(&data, &symbol, &strategy, config.as_ref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data, symbol } => run_info(&data, symbol.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            (&err).into()
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, EngineError> {
    match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            EngineConfig::from_file(path)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Build one of the shipped strategy variants, its risk sub-block seeded from
/// the configured limits.
fn build_strategy(name: &str, config: &EngineConfig) -> Result<Box<dyn Strategy>, EngineError> {
    let mut strategy_config = StrategyConfig::new(name);
    strategy_config.risk.max_position_size_pct = config.limits.max_position_size_pct;
    strategy_config.risk.stop_loss_pct = config.limits.stop_loss_pct;
    strategy_config.risk.take_profit_pct = config.limits.take_profit_pct;
    strategy_config.risk.max_drawdown_pct = config.limits.max_drawdown_pct;

    match name {
        "ma_crossover" => Ok(Box::new(MaCrossover::new(strategy_config))),
        "rsi_threshold" => Ok(Box::new(RsiThreshold::new(strategy_config))),
        "macd_cross" => Ok(Box::new(MacdCross::new(strategy_config))),
        "bollinger_touch" => Ok(Box::new(BollingerTouch::new(strategy_config))),
        "ichimoku_cloud" => Ok(Box::new(IchimokuCloud::new(strategy_config))),
        other => Err(EngineError::not_found("strategy", other)),
    }
}

fn fetch_window(
    data: &PathBuf,
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<PriceBar>, EngineError> {
    let feed = CsvFeed::new(data.clone());
    let start = start
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let end = end
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let bars = feed.fetch_bars(symbol, start, end)?;
    if bars.is_empty() {
        return Err(EngineError::Data {
            reason: format!("no bars for {symbol} in the requested range"),
        });
    }
    Ok(bars)
}

fn run_backtest_cmd(
    data: &PathBuf,
    symbol: &str,
    strategy_name: &str,
    config_path: Option<&PathBuf>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let strategy = build_strategy(strategy_name, &config)?;

    eprintln!("Loading {symbol} bars from {}", data.display());
    let bars = fetch_window(data, symbol, start, end)?;
    eprintln!("Running {strategy_name} over {} bars", bars.len());

    let report = run_backtest(strategy.as_ref(), &bars, config.portfolio.initial_cash)?;

    println!("Backtest: {} on {symbol}", report.strategy);
    println!("  initial balance: {:>12.2}", report.initial_balance);
    println!("  final balance:   {:>12.2}", report.final_balance);
    println!("  total return:    {:>11.2}%", report.total_return_pct);
    println!("  trades:          {:>8}", report.trade_count);
    println!("  win rate:        {:>11.2}%", report.win_rate_pct);
    println!("  max drawdown:    {:>11.2}%", report.max_drawdown_pct);
    println!("  sharpe:          {:>12.3}", report.sharpe_ratio);
    println!("  profit factor:   {:>12.3}", report.profit_factor);
    Ok(())
}

fn run_signals(
    data: &PathBuf,
    symbol: &str,
    config_path: Option<&PathBuf>,
) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let bars = fetch_window(data, symbol, None, None)?;

    let exchange = Arc::new(SimExchange::new());
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(
        exchange,
        store,
        config.limits.clone(),
        config.commission.clone(),
    );
    for name in [
        "ma_crossover",
        "rsi_threshold",
        "macd_cross",
        "bollinger_touch",
        "ichimoku_cloud",
    ] {
        engine.strategies.register(build_strategy(name, &config)?);
    }

    eprintln!("Evaluating {} strategies over {} bars", 5, bars.len());
    let consolidated = engine.strategies.run_all_active(&bars);
    if consolidated.is_empty() {
        println!("No signals for {symbol}.");
        return Ok(());
    }
    for signal in consolidated {
        println!(
            "{} {:?} strength {:.0} confidence {:.2} at {:.2} ({})",
            signal.symbol, signal.kind, signal.strength, signal.confidence, signal.price,
            signal.reason
        );
    }
    Ok(())
}

fn run_paper(
    data: &PathBuf,
    symbol: &str,
    strategy_name: &str,
    config_path: Option<&PathBuf>,
) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let bars = fetch_window(data, symbol, None, None)?;

    let exchange = Arc::new(SimExchange::new());
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(
        Arc::clone(&exchange) as Arc<dyn crate::ports::exchange::ExchangePort>,
        store,
        config.limits.clone(),
        config.commission.clone(),
    );

    let strategy = build_strategy(strategy_name, &config)?;
    let lookback = strategy.min_lookback();
    engine.strategies.register(strategy);

    let portfolio_id = config.portfolio.id.clone();
    engine.ledger.create_portfolio(
        &portfolio_id,
        &config.portfolio.owner,
        &config.portfolio.name,
        config.portfolio.initial_cash,
    )?;
    let size_pct = config.limits.max_position_size_pct / 100.0;

    eprintln!("Paper trading {strategy_name} on {symbol} over {} bars", bars.len());
    for i in lookback..bars.len() {
        let bar = &bars[i];
        exchange.set_price(symbol, bar.close);

        let signals = engine.strategies.run_strategy(strategy_name, &bars[..=i])?;
        for signal in signals {
            let portfolio = engine
                .ledger
                .portfolio(&portfolio_id)
                .ok_or_else(|| EngineError::not_found("portfolio", portfolio_id.clone()))?;
            match signal.kind {
                SignalKind::Buy if portfolio.position(symbol).is_none() => {
                    let quantity = portfolio.cash_balance * size_pct / signal.price;
                    if quantity <= 0.0 {
                        continue;
                    }
                    let mut request =
                        OrderRequest::market(&portfolio_id, symbol, crate::domain::order::OrderSide::Buy, quantity);
                    request.stop_loss = signal.stop_loss;
                    request.take_profit = signal.take_profit;
                    let report = engine.orders.execute(&request);
                    if !report.success {
                        eprintln!("buy skipped: {}", report.message);
                    }
                }
                SignalKind::Sell => {
                    if let Some(position) = portfolio.position(symbol) {
                        let request = OrderRequest::market(
                            &portfolio_id,
                            symbol,
                            crate::domain::order::OrderSide::Sell,
                            position.quantity,
                        );
                        let report = engine.orders.execute(&request);
                        if !report.success {
                            eprintln!("sell skipped: {}", report.message);
                        }
                    }
                }
                _ => {}
            }
        }

        let mut prices = std::collections::HashMap::new();
        prices.insert(symbol.to_string(), bar.close);
        engine.ledger.mark_to_market(&portfolio_id, &prices)?;
    }

    let portfolio = engine
        .ledger
        .portfolio(&portfolio_id)
        .ok_or_else(|| EngineError::not_found("portfolio", portfolio_id.clone()))?;
    let account = crate::domain::account::AccountSnapshot {
        balance: portfolio.cash_balance,
        equity: portfolio.total_equity,
        margin_used: portfolio.margin_used,
        free_margin: portfolio.free_margin,
    };
    let metrics = engine.risk.monitor(&portfolio, &account);

    println!("Paper session: {strategy_name} on {symbol}");
    println!("  final value:    {:>12.2}", portfolio.total_value);
    println!("  cash:           {:>12.2}", portfolio.cash_balance);
    println!("  realized pnl:   {:>12.2}", portfolio.realized_pnl);
    println!("  unrealized pnl: {:>12.2}", portfolio.unrealized_pnl);
    println!("  orders:         {:>8}", engine.orders.orders().len());
    println!("  risk score:     {:>12.1}", metrics.risk_score);
    for alert in engine.risk.alerts() {
        println!("  alert: {}", alert.message);
    }
    Ok(())
}

fn run_validate(config_path: &PathBuf) -> Result<(), EngineError> {
    let config = EngineConfig::from_file(config_path)?;
    println!("Config OK: {}", config_path.display());
    println!(
        "  portfolio '{}' with {:.2} initial cash",
        config.portfolio.id, config.portfolio.initial_cash
    );
    println!(
        "  limits: {:.0}% max position, {:.1}x max leverage, {} open positions",
        config.limits.max_position_size_pct,
        config.limits.max_leverage,
        config.limits.max_open_positions
    );
    Ok(())
}

fn run_info(data: &PathBuf, symbol: Option<&str>) -> Result<(), EngineError> {
    let feed = CsvFeed::new(data.clone());
    let symbols = match symbol {
        Some(s) => vec![s.to_string()],
        None => feed.list_symbols()?,
    };
    if symbols.is_empty() {
        println!("No CSV data under {}", data.display());
        return Ok(());
    }

    for symbol in symbols {
        let bars = feed.fetch_bars(&symbol, DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)?;
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => println!(
                "{symbol}: {} bars, {} to {}",
                bars.len(),
                first.timestamp.format("%Y-%m-%d %H:%M"),
                last.timestamp.format("%Y-%m-%d %H:%M"),
            ),
            _ => println!("{symbol}: no bars"),
        }
    }
    Ok(())
}
