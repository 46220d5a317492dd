//! Backtest simulation engine.
//!
//! Replays a strategy day by day over a price series against an isolated
//! `{cash, shares}` state, never the live ledger. Decisions only ever see
//! data up to and including the current bar; the final bar is reserved as
//! the unrealized next-day reference and is never traded on.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use super::error::PapertraderError;
use super::indicator::{rsi, sma};
use super::metrics::BacktestMetrics;
use super::mock;
use super::series::PriceSeries;
use super::signal::{self, Decision, SignalConfig};
use super::transaction::TradeSide;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Momentum,
    MeanReversion,
    Oscillator,
    /// Stress variant: follows the daily price direction, so it trades on
    /// almost every bar.
    Aggressive,
    /// Stress variant: alternates buy/sell by bar parity.
    HyperAggressive,
    /// Full signal-aggregator decision per bar.
    Combined,
}

impl StrategyKind {
    pub fn parse(name: &str) -> Result<StrategyKind, PapertraderError> {
        match name.to_lowercase().replace('_', "-").as_str() {
            "momentum" => Ok(StrategyKind::Momentum),
            "mean-reversion" => Ok(StrategyKind::MeanReversion),
            "oscillator" | "rsi" => Ok(StrategyKind::Oscillator),
            "aggressive" => Ok(StrategyKind::Aggressive),
            "hyper-aggressive" => Ok(StrategyKind::HyperAggressive),
            "combined" => Ok(StrategyKind::Combined),
            _ => Err(PapertraderError::UnknownStrategy {
                name: name.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Momentum => "momentum",
            StrategyKind::MeanReversion => "mean-reversion",
            StrategyKind::Oscillator => "oscillator",
            StrategyKind::Aggressive => "aggressive",
            StrategyKind::HyperAggressive => "hyper-aggressive",
            StrategyKind::Combined => "combined",
        }
    }

    /// The variants ranked by [`compare`].
    pub fn comparable() -> [StrategyKind; 5] {
        [
            StrategyKind::Momentum,
            StrategyKind::MeanReversion,
            StrategyKind::Oscillator,
            StrategyKind::Aggressive,
            StrategyKind::HyperAggressive,
        ]
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Per-order share cap for the execution policy.
    pub max_shares_per_trade: f64,
    /// Bars required before the first decision.
    pub min_history: usize,
    pub risk_free_rate: f64,
    /// Length of the synthesized series when the input is absent or too short.
    pub synthetic_days: usize,
    pub signal: SignalConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            max_shares_per_trade: 10.0,
            min_history: 20,
            risk_free_rate: 0.05,
            synthetic_days: 100,
            signal: SignalConfig::default(),
        }
    }
}

impl BacktestConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let defaults = BacktestConfig::default();
        BacktestConfig {
            initial_capital: config.get_double(
                "backtest",
                "initial_capital",
                defaults.initial_capital,
            ),
            max_shares_per_trade: config.get_double(
                "backtest",
                "max_shares_per_trade",
                defaults.max_shares_per_trade,
            ),
            min_history: config.get_int("backtest", "min_history", defaults.min_history as i64)
                as usize,
            risk_free_rate: config.get_double(
                "backtest",
                "risk_free_rate",
                defaults.risk_free_rate,
            ),
            synthetic_days: config.get_int(
                "backtest",
                "synthetic_days",
                defaults.synthetic_days as i64,
            ) as usize,
            signal: SignalConfig::from_config(config),
        }
    }
}

/// An order that actually executed during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeEvent {
    pub date: NaiveDate,
    pub side: TradeSide,
    pub shares: f64,
    pub price: f64,
    pub amount: f64,
    /// For sells: whether the sale price beat the run's average cost at the
    /// moment of sale. Buys stay unresolved (`None`).
    pub profitable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub initial_capital: f64,
    pub final_value: f64,
    pub metrics: BacktestMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeEvent>,
    pub period: BacktestPeriod,
}

/// Run one strategy over a series. A missing or too-short series is replaced
/// by a deterministic synthetic one so a backtest always returns a result.
pub fn run(
    strategy: StrategyKind,
    symbol: &str,
    series: Option<&PriceSeries>,
    config: &BacktestConfig,
) -> BacktestResult {
    let minimum = config.min_history + 2;
    let synthesized;
    let series = match series {
        Some(series) if series.len() >= minimum => series,
        other => {
            warn!(
                symbol,
                bars = other.map_or(0, |s| s.len()),
                minimum,
                "series absent or too short, synthesizing data for backtest"
            );
            synthesized = mock::synthetic_series(symbol, config.synthetic_days.max(minimum));
            &synthesized
        }
    };

    let mut cash = config.initial_capital;
    let mut shares = 0.0_f64;
    let mut average_cost = 0.0_f64;
    let mut cost_basis = 0.0_f64;

    let mut peak = config.initial_capital;
    let mut max_drawdown = 0.0_f64;
    let mut returns: Vec<f64> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::new();
    let mut trades: Vec<TradeEvent> = Vec::new();

    for i in config.min_history..series.len() - 1 {
        let price = series.close[i];
        let date = series.dates[i];
        let decision = decide(strategy, series, i, &config.signal);

        match decision {
            Decision::Buy if cash >= price && price > 0.0 => {
                let affordable = (cash / price).floor();
                let quantity = affordable.min(config.max_shares_per_trade).max(1.0);
                let cost = quantity * price;

                cash -= cost;
                cost_basis += cost;
                shares += quantity;
                average_cost = cost_basis / shares;

                trades.push(TradeEvent {
                    date,
                    side: TradeSide::Buy,
                    shares: quantity,
                    price,
                    amount: cost,
                    profitable: None,
                });
            }
            Decision::Sell if shares >= 1.0 => {
                let quantity = shares.min(config.max_shares_per_trade);
                let revenue = quantity * price;

                cash += revenue;
                shares -= quantity;
                cost_basis = shares * average_cost;
                let profitable = price > average_cost;
                if shares == 0.0 {
                    average_cost = 0.0;
                }

                trades.push(TradeEvent {
                    date,
                    side: TradeSide::Sell,
                    shares: quantity,
                    price,
                    amount: revenue,
                    profitable: Some(profitable),
                });
            }
            _ => {}
        }

        let value = cash + shares * price;
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let drawdown = (peak - value) / peak;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }

        if let Some(previous) = equity_curve.last() {
            if previous.value > 0.0 {
                returns.push((value - previous.value) / previous.value);
            }
        }
        equity_curve.push(EquityPoint { date, value });
    }

    let final_value = equity_curve
        .last()
        .map(|p| p.value)
        .unwrap_or(config.initial_capital);
    let metrics = BacktestMetrics::compute(
        &trades,
        &returns,
        max_drawdown,
        config.initial_capital,
        final_value,
        config.risk_free_rate,
    );

    BacktestResult {
        symbol: symbol.to_string(),
        strategy,
        initial_capital: config.initial_capital,
        final_value,
        metrics,
        period: BacktestPeriod {
            start: series.dates[config.min_history],
            end: series.dates[series.len() - 2],
            days: equity_curve.len(),
        },
        equity_curve,
        trades,
    }
}

/// Run every comparable strategy variant and rank by total return,
/// descending.
pub fn compare(
    symbol: &str,
    series: Option<&PriceSeries>,
    config: &BacktestConfig,
) -> Vec<BacktestResult> {
    let mut results: Vec<BacktestResult> = StrategyKind::comparable()
        .into_iter()
        .map(|strategy| run(strategy, symbol, series, config))
        .collect();

    results.sort_by(|a, b| {
        b.metrics
            .total_return
            .partial_cmp(&a.metrics.total_return)
            .unwrap_or(Ordering::Equal)
    });
    results
}

fn decide(
    strategy: StrategyKind,
    series: &PriceSeries,
    index: usize,
    signal_config: &SignalConfig,
) -> Decision {
    let closes = &series.close[..=index];
    let last = closes[closes.len() - 1];

    match strategy {
        StrategyKind::Momentum => {
            let average = sma(closes, signal::MOVING_AVERAGE_PERIOD).unwrap_or(last);
            if last > average {
                Decision::Buy
            } else if last < average {
                Decision::Sell
            } else {
                Decision::Hold
            }
        }
        StrategyKind::MeanReversion => {
            let average = sma(closes, signal::MOVING_AVERAGE_PERIOD).unwrap_or(last);
            if last < average * 0.95 {
                Decision::Buy
            } else if last > average * 1.05 {
                Decision::Sell
            } else {
                Decision::Hold
            }
        }
        StrategyKind::Oscillator => {
            let value = rsi(closes, signal::OSCILLATOR_PERIOD);
            if value < 30.0 {
                Decision::Buy
            } else if value > 70.0 {
                Decision::Sell
            } else {
                Decision::Hold
            }
        }
        StrategyKind::Aggressive => {
            if index == 0 || series.close[index] >= series.close[index - 1] {
                Decision::Buy
            } else {
                Decision::Sell
            }
        }
        StrategyKind::HyperAggressive => {
            if index % 2 == 0 {
                Decision::Buy
            } else {
                Decision::Sell
            }
        }
        StrategyKind::Combined => signal::evaluate_prefix(series, index, signal_config).decision,
    }
}
