//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use crate::adapters::csv_market_adapter::CsvMarketAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::http_market_adapter::HttpMarketAdapter;
use crate::adapters::memory_store_adapter::MemoryStoreAdapter;
use crate::autotrade::{AutoTrader, TradingSettings};
use crate::domain::backtest::{self, BacktestConfig, BacktestResult, StrategyKind};
use crate::domain::error::PapertraderError;
use crate::domain::ledger::{DEFAULT_INITIAL_CAPITAL, Ledger, ValuationSnapshot};
use crate::domain::signal::{self, SignalConfig};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::store_port::LedgerStorePort;

const DEFAULT_HISTORY_DAYS: usize = 60;

#[derive(Parser, Debug)]
#[command(
    name = "papertrader",
    about = "Simulated equity trading account and strategy backtester"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the account valuation
    Portfolio {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Buy shares (at the market price unless --price is given)
    Buy {
        symbol: String,
        quantity: f64,
        #[arg(long)]
        price: Option<f64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Sell shares (at the market price unless --price is given)
    Sell {
        symbol: String,
        quantity: f64,
        #[arg(long)]
        price: Option<f64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Reset the account to an empty ledger
    Reset {
        #[arg(long)]
        capital: Option<f64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show transaction history, newest first
    History {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Evaluate the trading signal for one symbol
    Signal {
        symbol: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Evaluate signals for a comma-separated symbol list, with sentiment
    Signals {
        symbols: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Backtest one strategy over a symbol's history
    Backtest {
        strategy: String,
        symbol: String,
        #[arg(long)]
        capital: Option<f64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Backtest all strategy variants and rank them by return
    Compare {
        symbol: String,
        #[arg(long)]
        capital: Option<f64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run the automated trading driver
    Autotrade {
        /// Run this many cycles back-to-back and exit instead of looping
        #[arg(long)]
        cycles: Option<u32>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Start the web API server
    Serve {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Portfolio { config } => run_portfolio(config.as_ref()),
        Command::Buy {
            symbol,
            quantity,
            price,
            config,
        } => run_trade(&symbol, quantity, price, true, config.as_ref()),
        Command::Sell {
            symbol,
            quantity,
            price,
            config,
        } => run_trade(&symbol, quantity, price, false, config.as_ref()),
        Command::Reset { capital, config } => run_reset(capital, config.as_ref()),
        Command::History { limit, config } => run_history(limit, config.as_ref()),
        Command::Signal { symbol, config } => run_signal(&symbol, config.as_ref()),
        Command::Signals { symbols, config } => run_signals(&symbols, config.as_ref()),
        Command::Backtest {
            strategy,
            symbol,
            capital,
            config,
        } => run_backtest(&strategy, &symbol, capital, config.as_ref()),
        Command::Compare {
            symbol,
            capital,
            config,
        } => run_compare(&symbol, capital, config.as_ref()),
        Command::Autotrade { cycles, config } => run_autotrade(cycles, config.as_ref()),
        Command::Serve { config } => run_serve(config.as_ref()),
    }
}

pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, ExitCode> {
    match path {
        Some(path) => FileConfigAdapter::from_file(path).map_err(|e| {
            let err = PapertraderError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            };
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }),
        // No config file: every setting falls back to its default.
        None => FileConfigAdapter::from_string("").map_err(|e| {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }),
    }
}

pub fn build_market(
    config: &dyn ConfigPort,
) -> Result<Arc<dyn MarketDataPort + Send + Sync>, PapertraderError> {
    let source = config
        .get_string("market", "source")
        .unwrap_or_else(|| "http".to_string());
    match source.as_str() {
        "http" => Ok(Arc::new(HttpMarketAdapter::from_config(config)?)),
        "csv" => {
            let dir = config.get_string("market", "csv_dir").ok_or_else(|| {
                PapertraderError::ConfigMissing {
                    section: "market".into(),
                    key: "csv_dir".into(),
                }
            })?;
            Ok(Arc::new(CsvMarketAdapter::new(PathBuf::from(dir))))
        }
        other => Err(PapertraderError::ConfigInvalid {
            section: "market".into(),
            key: "source".into(),
            reason: format!("unknown source: {other}"),
        }),
    }
}

pub fn build_store(
    config: &dyn ConfigPort,
) -> Result<Arc<dyn LedgerStorePort + Send + Sync>, PapertraderError> {
    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_store_adapter::SqliteStoreAdapter;

        if config.get_string("sqlite", "path").is_some() {
            return Ok(Arc::new(SqliteStoreAdapter::from_config(config)?));
        }
        eprintln!("no [sqlite] path configured, keeping ledger in memory only");
    }
    #[cfg(not(feature = "sqlite"))]
    {
        let _ = config;
    }
    Ok(Arc::new(MemoryStoreAdapter::new()))
}

fn open_ledger(config: &dyn ConfigPort) -> Result<Ledger, PapertraderError> {
    let market = build_market(config)?;
    let store = build_store(config)?;
    let account_id = config
        .get_string("account", "id")
        .unwrap_or_else(|| "default-user".to_string());
    let initial_capital =
        config.get_double("account", "initial_capital", DEFAULT_INITIAL_CAPITAL);
    Ok(Ledger::open(account_id, initial_capital, market, store))
}

fn print_snapshot(snapshot: &ValuationSnapshot) {
    eprintln!("Cash:           {:.2}", snapshot.cash);
    eprintln!("Holdings value: {:.2}", snapshot.holdings_value);
    eprintln!("Total value:    {:.2}", snapshot.total_value);
    eprintln!(
        "P/L:            {:+.2} ({:+.2}%)",
        snapshot.profit_loss, snapshot.profit_loss_pct
    );
    for (symbol, view) in &snapshot.holdings {
        eprintln!(
            "  {}: {} @ {:.2} (now {:.2}, {:+.2})",
            symbol, view.quantity, view.average_cost, view.current_price, view.unrealized_pnl
        );
    }
    match serde_json::to_string_pretty(snapshot) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: failed to encode snapshot: {e}"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to encode output: {e}");
            ExitCode::from(1)
        }
    }
}

fn run_portfolio(config_path: Option<&PathBuf>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let ledger = match open_ledger(&config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_snapshot(&ledger.valuation());
    ExitCode::SUCCESS
}

fn run_trade(
    symbol: &str,
    quantity: f64,
    price: Option<f64>,
    is_buy: bool,
    config_path: Option<&PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let mut ledger = match open_ledger(&config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let symbol = symbol.to_uppercase();
    let result = match (is_buy, price) {
        (true, Some(price)) => ledger.buy(&symbol, quantity, price),
        (true, None) => ledger.buy_at_market(&symbol, quantity),
        (false, Some(price)) => ledger.sell(&symbol, quantity, price),
        (false, None) => ledger.sell_at_market(&symbol, quantity),
    };

    match result {
        Ok(snapshot) => {
            eprintln!(
                "{} {} {}",
                if is_buy { "Bought" } else { "Sold" },
                quantity,
                symbol
            );
            print_snapshot(&snapshot);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_reset(capital: Option<f64>, config_path: Option<&PathBuf>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let mut ledger = match open_ledger(&config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let capital = capital.unwrap_or_else(|| {
        config.get_double("account", "initial_capital", DEFAULT_INITIAL_CAPITAL)
    });
    let snapshot = ledger.reset(capital);
    eprintln!("Ledger reset with capital {capital:.2}");
    print_snapshot(&snapshot);
    ExitCode::SUCCESS
}

fn run_history(limit: Option<usize>, config_path: Option<&PathBuf>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let ledger = match open_ledger(&config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let transactions = ledger.transactions(limit);
    eprintln!("{} transactions", transactions.len());
    for tx in &transactions {
        eprintln!(
            "  {} {} {} {} @ {:.2} ({:.2})",
            tx.timestamp.format("%Y-%m-%d %H:%M:%S"),
            tx.side,
            tx.quantity,
            tx.symbol,
            tx.price,
            tx.amount
        );
    }
    print_json(&transactions)
}

fn run_signal(symbol: &str, config_path: Option<&PathBuf>) -> ExitCode {
    run_signals(symbol, config_path)
}

fn run_signals(symbols: &str, config_path: Option<&PathBuf>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let market = match build_market(&config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let symbols: Vec<String> = symbols
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        eprintln!("error: no symbols given");
        return ExitCode::from(2);
    }

    let signal_config = SignalConfig::from_config(&config);
    let history_days =
        config.get_int("market", "history_days", DEFAULT_HISTORY_DAYS as i64) as usize;
    let signals =
        signal::evaluate_symbols(market.as_ref(), &symbols, history_days, &signal_config);

    for signal in &signals {
        eprintln!(
            "{}: {} ({:.0}%)  oscillator {:.1}, close {:.2} vs avg {:.2}",
            signal.symbol,
            signal.decision,
            signal.confidence,
            signal.indicators.oscillator,
            signal.indicators.last_close,
            signal.indicators.moving_average
        );
    }

    if symbols.len() == 1 {
        match signals.into_iter().next() {
            Some(signal) => print_json(&signal),
            None => {
                eprintln!("error: no signal produced for {}", symbols[0]);
                ExitCode::from(5)
            }
        }
    } else {
        let sentiment = signal::market_sentiment(&signals);
        eprintln!(
            "Sentiment: {} ({} bullish / {} bearish / {} neutral)",
            sentiment.overall, sentiment.bullish, sentiment.bearish, sentiment.neutral
        );
        print_json(&serde_json::json!({
            "signals": signals,
            "sentiment": sentiment,
        }))
    }
}

fn print_backtest_summary(result: &BacktestResult) {
    eprintln!(
        "{} on {}: {} trades over {} days",
        result.strategy,
        result.symbol,
        result.metrics.total_trades,
        result.period.days
    );
    eprintln!("  Total Return:   {:.2}%", result.metrics.total_return * 100.0);
    eprintln!(
        "  Annualized:     {:.2}%",
        result.metrics.annualized_return * 100.0
    );
    eprintln!("  Sharpe Ratio:   {:.2}", result.metrics.sharpe_ratio);
    eprintln!(
        "  Max Drawdown:   -{:.1}%",
        result.metrics.max_drawdown * 100.0
    );
    eprintln!("  Win Rate:       {:.1}%", result.metrics.win_rate * 100.0);
    eprintln!("  Final Value:    {:.2}", result.final_value);
}

fn run_backtest(
    strategy: &str,
    symbol: &str,
    capital: Option<f64>,
    config_path: Option<&PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let strategy = match StrategyKind::parse(strategy) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let market = match build_market(&config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let mut bt_config = BacktestConfig::from_config(&config);
    if let Some(capital) = capital {
        bt_config.initial_capital = capital;
    }
    let symbol = symbol.to_uppercase();
    let history_days =
        config.get_int("market", "history_days", DEFAULT_HISTORY_DAYS as i64) as usize;

    eprintln!("Backtesting {strategy} on {symbol}...");
    let series = market.historical_series(&symbol, history_days).ok();
    let result = backtest::run(strategy, &symbol, series.as_ref(), &bt_config);

    print_backtest_summary(&result);
    print_json(&result)
}

fn run_compare(symbol: &str, capital: Option<f64>, config_path: Option<&PathBuf>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let market = match build_market(&config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let mut bt_config = BacktestConfig::from_config(&config);
    if let Some(capital) = capital {
        bt_config.initial_capital = capital;
    }
    let symbol = symbol.to_uppercase();
    let history_days =
        config.get_int("market", "history_days", DEFAULT_HISTORY_DAYS as i64) as usize;

    eprintln!("Comparing strategies on {symbol}...");
    let series = market.historical_series(&symbol, history_days).ok();
    let results = backtest::compare(&symbol, series.as_ref(), &bt_config);

    for result in &results {
        print_backtest_summary(result);
    }
    print_json(&results)
}

fn run_autotrade(cycles: Option<u32>, config_path: Option<&PathBuf>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let market = match build_market(&config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let ledger = match open_ledger(&config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let settings = TradingSettings::from_config(&config);
    let signal_config = SignalConfig::from_config(&config);
    let mut trader = AutoTrader::new(
        Arc::new(Mutex::new(ledger)),
        market,
        settings,
        signal_config,
    );

    match cycles {
        Some(n) => {
            for _ in 0..n {
                let executed = trader.run_cycle();
                eprintln!("cycle complete: {executed} trades");
            }
            ExitCode::SUCCESS
        }
        None => {
            if !trader.start() {
                eprintln!("error: auto trading failed to start");
                return ExitCode::from(1);
            }
            eprintln!("auto trading running; press Ctrl-C to stop");
            loop {
                std::thread::park();
            }
        }
    }
}

fn run_serve(config_path: Option<&PathBuf>) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};
        use std::net::SocketAddr;

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };
        let market = match build_market(&config) {
            Ok(m) => m,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        let ledger = match open_ledger(&config) {
            Ok(l) => l,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let addr: SocketAddr = config
            .get_string("web", "listen")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
            .parse()
            .unwrap_or_else(|_| "127.0.0.1:3000".parse().unwrap());

        let history_days =
            config.get_int("market", "history_days", DEFAULT_HISTORY_DAYS as i64) as usize;
        let state = AppState {
            ledger: Arc::new(Mutex::new(ledger)),
            market,
            signal_config: SignalConfig::from_config(&config),
            backtest_config: BacktestConfig::from_config(&config),
            history_days,
        };

        eprintln!("Starting web server on {addr}");
        let router = build_router(state);

        tokio::runtime::Runtime::new().unwrap().block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
            axum::serve(listener, router).await.unwrap();
        });

        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}
