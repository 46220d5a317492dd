//! Automated trading driver.
//!
//! Runs a periodic cycle: evaluate live signals for a symbol list and place
//! ledger trades for every signal clearing the confidence floor, with
//! fraction-of-cash position sizing and a daily trade cap. A failed trade is
//! skipped, never retried, and never aborts the cycle.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ledger::Ledger;
use crate::domain::mock;
use crate::domain::signal::{self, Decision, SignalConfig};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingSettings {
    pub symbols: Vec<String>,
    #[serde(skip)]
    pub cycle_interval: Duration,
    /// Fraction of available cash committed per trade.
    pub max_position_fraction: f64,
    pub max_shares_per_trade: f64,
    pub max_daily_trades: u32,
    /// Signals below this combined confidence are ignored.
    pub min_confidence: f64,
    /// History window handed to the signal aggregator.
    pub history_days: usize,
}

impl Default for TradingSettings {
    fn default() -> Self {
        TradingSettings {
            symbols: vec![
                "RELIANCE".to_string(),
                "TCS".to_string(),
                "INFY".to_string(),
                "HDFCBANK".to_string(),
            ],
            cycle_interval: Duration::from_secs(300),
            max_position_fraction: 0.10,
            max_shares_per_trade: 2.0,
            max_daily_trades: 10,
            min_confidence: 55.0,
            history_days: 60,
        }
    }
}

impl TradingSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let defaults = TradingSettings::default();
        let symbols = config
            .get_string("autotrade", "symbols")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|symbols| !symbols.is_empty())
            .unwrap_or(defaults.symbols);

        TradingSettings {
            symbols,
            cycle_interval: Duration::from_secs(config.get_int(
                "autotrade",
                "interval_secs",
                defaults.cycle_interval.as_secs() as i64,
            ) as u64),
            max_position_fraction: config.get_double(
                "autotrade",
                "max_position_fraction",
                defaults.max_position_fraction,
            ),
            max_shares_per_trade: config.get_double(
                "autotrade",
                "max_shares_per_trade",
                defaults.max_shares_per_trade,
            ),
            max_daily_trades: config.get_int(
                "autotrade",
                "max_daily_trades",
                defaults.max_daily_trades as i64,
            ) as u32,
            min_confidence: config.get_double(
                "autotrade",
                "min_confidence",
                defaults.min_confidence,
            ),
            history_days: config.get_int(
                "autotrade",
                "history_days",
                defaults.history_days as i64,
            ) as usize,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyStats {
    pub trades_today: u32,
    pub last_trade_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoTraderStatus {
    pub running: bool,
    pub settings: TradingSettings,
    pub stats: DailyStats,
}

struct Shared {
    running: Mutex<bool>,
    wakeup: Condvar,
    stats: Mutex<DailyStats>,
}

pub struct AutoTrader {
    ledger: Arc<Mutex<Ledger>>,
    market: Arc<dyn MarketDataPort + Send + Sync>,
    settings: TradingSettings,
    signal_config: SignalConfig,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl AutoTrader {
    pub fn new(
        ledger: Arc<Mutex<Ledger>>,
        market: Arc<dyn MarketDataPort + Send + Sync>,
        settings: TradingSettings,
        signal_config: SignalConfig,
    ) -> Self {
        AutoTrader {
            ledger,
            market,
            settings,
            signal_config,
            shared: Arc::new(Shared {
                running: Mutex::new(false),
                wakeup: Condvar::new(),
                stats: Mutex::new(DailyStats::default()),
            }),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        *self.shared.running.lock().unwrap()
    }

    pub fn status(&self) -> AutoTraderStatus {
        AutoTraderStatus {
            running: self.is_running(),
            settings: self.settings.clone(),
            stats: self.shared.stats.lock().unwrap().clone(),
        }
    }

    /// Run one synchronous trading cycle. Exposed so callers and tests can
    /// drive the driver without the background thread.
    pub fn run_cycle(&self) -> usize {
        trading_cycle(
            &self.ledger,
            self.market.as_ref(),
            &self.settings,
            &self.signal_config,
            &self.shared.stats,
        )
    }

    /// Start the background cycle. Returns false if already running.
    pub fn start(&mut self) -> bool {
        {
            let mut running = self.shared.running.lock().unwrap();
            if *running {
                warn!("auto trading already running");
                return false;
            }
            *running = true;
        }

        info!(symbols = ?self.settings.symbols, "starting auto trading");
        let ledger = Arc::clone(&self.ledger);
        let market = Arc::clone(&self.market);
        let settings = self.settings.clone();
        let signal_config = self.signal_config.clone();
        let shared = Arc::clone(&self.shared);
        let interval = self.settings.cycle_interval;

        self.handle = Some(std::thread::spawn(move || {
            loop {
                let executed = trading_cycle(
                    &ledger,
                    market.as_ref(),
                    &settings,
                    &signal_config,
                    &shared.stats,
                );
                debug!(executed, "trading cycle complete");

                let guard = shared.running.lock().unwrap();
                if !*guard {
                    break;
                }
                let (guard, _) = shared.wakeup.wait_timeout(guard, interval).unwrap();
                if !*guard {
                    break;
                }
            }
        }));
        true
    }

    /// Stop the background cycle. Synchronous: when this returns, no further
    /// cycle will start (a cycle already in flight is allowed to finish).
    pub fn stop(&mut self) {
        {
            let mut running = self.shared.running.lock().unwrap();
            if !*running {
                return;
            }
            *running = false;
        }
        self.shared.wakeup.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("auto trading thread panicked");
            }
        }
        info!("auto trading stopped");
    }
}

impl Drop for AutoTrader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn trading_cycle(
    ledger: &Mutex<Ledger>,
    market: &dyn MarketDataPort,
    settings: &TradingSettings,
    signal_config: &SignalConfig,
    stats: &Mutex<DailyStats>,
) -> usize {
    reset_stats_if_new_day(&mut stats.lock().unwrap(), Utc::now().date_naive());

    let valuation = ledger.lock().unwrap().valuation();
    info!(
        cash = valuation.cash,
        total = valuation.total_value,
        symbols = settings.symbols.len(),
        "starting trading cycle"
    );

    let signals = signal::evaluate_symbols(
        market,
        &settings.symbols,
        settings.history_days,
        signal_config,
    );

    let mut executed = 0;
    for signal in &signals {
        {
            let stats = stats.lock().unwrap();
            if stats.trades_today >= settings.max_daily_trades {
                info!("daily trade limit reached");
                break;
            }
        }

        if signal.confidence < settings.min_confidence {
            debug!(
                symbol = %signal.symbol,
                confidence = signal.confidence,
                "skipping signal below confidence floor"
            );
            continue;
        }
        if signal.decision == Decision::Hold {
            continue;
        }

        let price = match market.current_price(&signal.symbol) {
            Ok(price) => price,
            Err(e) => {
                warn!(symbol = %signal.symbol, error = %e, "price unavailable, using reference price");
                mock::reference_price(&signal.symbol)
            }
        };
        if price <= 0.0 {
            continue;
        }

        let traded = {
            let mut ledger = ledger.lock().unwrap();
            let cash = ledger.state().cash;
            let sized = (cash * settings.max_position_fraction / price)
                .floor()
                .min(settings.max_shares_per_trade)
                .max(1.0);

            match signal.decision {
                Decision::Buy => {
                    if sized * price > cash {
                        debug!(symbol = %signal.symbol, "insufficient cash for buy, skipping");
                        false
                    } else {
                        match ledger.buy(&signal.symbol, sized, price) {
                            Ok(_) => {
                                info!(symbol = %signal.symbol, shares = sized, price, "auto buy");
                                true
                            }
                            Err(e) => {
                                warn!(symbol = %signal.symbol, error = %e, "auto buy failed, skipping");
                                false
                            }
                        }
                    }
                }
                Decision::Sell => {
                    let held = ledger
                        .state()
                        .holdings
                        .get(&signal.symbol)
                        .map(|h| h.quantity)
                        .unwrap_or(0.0);
                    if held < 1.0 {
                        debug!(symbol = %signal.symbol, "nothing held to sell, skipping");
                        false
                    } else {
                        let quantity = sized.min(held);
                        match ledger.sell(&signal.symbol, quantity, price) {
                            Ok(_) => {
                                info!(symbol = %signal.symbol, shares = quantity, price, "auto sell");
                                true
                            }
                            Err(e) => {
                                warn!(symbol = %signal.symbol, error = %e, "auto sell failed, skipping");
                                false
                            }
                        }
                    }
                }
                Decision::Hold => false,
            }
        };

        if traded {
            let mut stats = stats.lock().unwrap();
            stats.trades_today += 1;
            stats.last_trade_date = Some(Utc::now().date_naive());
            executed += 1;
        }
    }

    executed
}

fn reset_stats_if_new_day(stats: &mut DailyStats, today: NaiveDate) {
    if stats.last_trade_date.is_some_and(|date| date != today) {
        info!("new trading day, resetting daily stats");
        stats.trades_today = 0;
        stats.last_trade_date = None;
    }
}
