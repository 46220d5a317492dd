//! Signal aggregation: four weighted heuristic strategies combined into one
//! trading decision with a confidence score.
//!
//! Momentum and mean reversion share a moving average but trigger with
//! opposite polarity at different bands, so they rarely agree on the same
//! bar.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::warn;

use super::indicator::{rsi, sma, volume_average};
use super::series::PriceSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;

pub const OSCILLATOR_PERIOD: usize = 14;
pub const MOVING_AVERAGE_PERIOD: usize = 20;
pub const VOLUME_PERIOD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    Buy,
    Sell,
    Hold,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Buy => "BUY",
            Decision::Sell => "SELL",
            Decision::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sub-strategy's verdict. `reading` is the value the strategy keyed on
/// (price/SMA ratio, deviation, oscillator value, volume ratio).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubSignal {
    pub decision: Decision,
    pub confidence: f64,
    pub reading: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyVerdicts {
    pub momentum: SubSignal,
    pub mean_reversion: SubSignal,
    pub oscillator: SubSignal,
    pub volume: SubSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorReadings {
    pub oscillator: f64,
    pub moving_average: f64,
    pub last_close: f64,
    pub volume_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub symbol: String,
    pub decision: Decision,
    pub confidence: f64,
    pub indicators: IndicatorReadings,
    pub strategies: StrategyVerdicts,
    pub generated_at: DateTime<Utc>,
}

/// Tunable aggregation parameters. The combination threshold and any
/// confidence boosting are explicit configuration so test and production
/// behavior can diverge without touching code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalConfig {
    pub momentum_weight: f64,
    pub mean_reversion_weight: f64,
    pub oscillator_weight: f64,
    pub volume_weight: f64,
    /// Minimum weighted score a BUY or SELL bucket must clear to win;
    /// anything below resolves to HOLD.
    pub decision_threshold: f64,
    /// Added to every sub-confidence before weighting, capped at 95.
    pub confidence_boost: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            momentum_weight: 0.30,
            mean_reversion_weight: 0.25,
            oscillator_weight: 0.25,
            volume_weight: 0.20,
            decision_threshold: 40.0,
            confidence_boost: 0.0,
        }
    }
}

impl SignalConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let defaults = SignalConfig::default();
        SignalConfig {
            momentum_weight: config.get_double("signal", "momentum_weight", defaults.momentum_weight),
            mean_reversion_weight: config.get_double(
                "signal",
                "mean_reversion_weight",
                defaults.mean_reversion_weight,
            ),
            oscillator_weight: config.get_double(
                "signal",
                "oscillator_weight",
                defaults.oscillator_weight,
            ),
            volume_weight: config.get_double("signal", "volume_weight", defaults.volume_weight),
            decision_threshold: config.get_double(
                "signal",
                "decision_threshold",
                defaults.decision_threshold,
            ),
            confidence_boost: config.get_double(
                "signal",
                "confidence_boost",
                defaults.confidence_boost,
            ),
        }
    }
}

/// Evaluate a full series.
pub fn evaluate(series: &PriceSeries, config: &SignalConfig) -> Signal {
    if series.is_empty() {
        return neutral_signal(&series.symbol);
    }
    evaluate_prefix(series, series.len() - 1, config)
}

/// Evaluate using only data up to and including `end`; this is the
/// backtester's look-ahead-free entry point.
pub fn evaluate_prefix(series: &PriceSeries, end: usize, config: &SignalConfig) -> Signal {
    if series.is_empty() || end >= series.len() {
        return neutral_signal(&series.symbol);
    }

    let closes = &series.close[..=end];
    let volumes = &series.volume[..=end];
    let last_close = closes[closes.len() - 1];

    let moving_average = sma(closes, MOVING_AVERAGE_PERIOD).unwrap_or(last_close);
    let oscillator = rsi(closes, OSCILLATOR_PERIOD);
    let avg_volume = volume_average(volumes, VOLUME_PERIOD);
    let volume_ratio = if avg_volume > 0.0 {
        volumes[volumes.len() - 1] / avg_volume
    } else {
        1.0
    };
    let price_change = series.daily_change(end);

    let momentum = momentum_strategy(last_close, moving_average);
    let mean_reversion = mean_reversion_strategy(last_close, moving_average);
    let oscillator_signal = oscillator_strategy(oscillator);
    let volume_signal = volume_strategy(volume_ratio, price_change);

    let (decision, confidence) = combine(
        &[
            (momentum, config.momentum_weight),
            (mean_reversion, config.mean_reversion_weight),
            (oscillator_signal, config.oscillator_weight),
            (volume_signal, config.volume_weight),
        ],
        config,
    );

    Signal {
        symbol: series.symbol.clone(),
        decision,
        confidence,
        indicators: IndicatorReadings {
            oscillator,
            moving_average,
            last_close,
            volume_ratio,
        },
        strategies: StrategyVerdicts {
            momentum,
            mean_reversion,
            oscillator: oscillator_signal,
            volume: volume_signal,
        },
        generated_at: Utc::now(),
    }
}

/// Price at least 3% above the moving average is strength, 3% below is
/// weakness.
fn momentum_strategy(last_close: f64, moving_average: f64) -> SubSignal {
    let ratio = if moving_average > 0.0 {
        last_close / moving_average
    } else {
        1.0
    };
    if ratio >= 1.03 {
        SubSignal {
            decision: Decision::Buy,
            confidence: 75.0,
            reading: ratio,
        }
    } else if ratio <= 0.97 {
        SubSignal {
            decision: Decision::Sell,
            confidence: 65.0,
            reading: ratio,
        }
    } else {
        SubSignal {
            decision: Decision::Hold,
            confidence: 50.0,
            reading: ratio,
        }
    }
}

/// Opposite polarity to momentum at a wider ±6% band.
fn mean_reversion_strategy(last_close: f64, moving_average: f64) -> SubSignal {
    let deviation = if moving_average > 0.0 {
        (last_close - moving_average) / moving_average
    } else {
        0.0
    };
    if deviation <= -0.06 {
        SubSignal {
            decision: Decision::Buy,
            confidence: 80.0,
            reading: deviation,
        }
    } else if deviation >= 0.06 {
        SubSignal {
            decision: Decision::Sell,
            confidence: 70.0,
            reading: deviation,
        }
    } else {
        SubSignal {
            decision: Decision::Hold,
            confidence: 55.0,
            reading: deviation,
        }
    }
}

/// Strong bands at 25/75, weak bands at 35/65.
fn oscillator_strategy(oscillator: f64) -> SubSignal {
    let (decision, confidence) = if oscillator < 25.0 {
        (Decision::Buy, 85.0)
    } else if oscillator > 75.0 {
        (Decision::Sell, 75.0)
    } else if oscillator < 35.0 {
        (Decision::Buy, 70.0)
    } else if oscillator > 65.0 {
        (Decision::Sell, 65.0)
    } else {
        (Decision::Hold, 60.0)
    };
    SubSignal {
        decision,
        confidence,
        reading: oscillator,
    }
}

/// High volume confirms a move only when the day's change is beyond ±2%.
fn volume_strategy(volume_ratio: f64, price_change: f64) -> SubSignal {
    let (decision, confidence) = if volume_ratio > 1.5 && price_change > 0.02 {
        (Decision::Buy, 70.0)
    } else if volume_ratio > 1.5 && price_change < -0.02 {
        (Decision::Sell, 70.0)
    } else {
        (Decision::Hold, 50.0)
    };
    SubSignal {
        decision,
        confidence,
        reading: volume_ratio,
    }
}

fn combine(weighted: &[(SubSignal, f64)], config: &SignalConfig) -> (Decision, f64) {
    let mut buy_score = 0.0;
    let mut sell_score = 0.0;
    let mut hold_score = 0.0;
    let mut total_weight = 0.0;

    for (signal, weight) in weighted {
        total_weight += weight;
        let confidence = (signal.confidence + config.confidence_boost).min(95.0);
        match signal.decision {
            Decision::Buy => buy_score += confidence * weight,
            Decision::Sell => sell_score += confidence * weight,
            Decision::Hold => hold_score += confidence * weight,
        }
    }

    if total_weight <= 0.0 {
        return (Decision::Hold, 50.0);
    }

    if buy_score >= sell_score
        && buy_score >= hold_score
        && buy_score > config.decision_threshold
    {
        (Decision::Buy, (buy_score / total_weight).round())
    } else if sell_score >= hold_score && sell_score > config.decision_threshold {
        (Decision::Sell, (sell_score / total_weight).round())
    } else {
        (Decision::Hold, (hold_score / total_weight).round())
    }
}

fn neutral_signal(symbol: &str) -> Signal {
    let hold = SubSignal {
        decision: Decision::Hold,
        confidence: 50.0,
        reading: 0.0,
    };
    Signal {
        symbol: symbol.to_string(),
        decision: Decision::Hold,
        confidence: 50.0,
        indicators: IndicatorReadings {
            oscillator: 50.0,
            moving_average: 0.0,
            last_close: 0.0,
            volume_ratio: 1.0,
        },
        strategies: StrategyVerdicts {
            momentum: hold,
            mean_reversion: hold,
            oscillator: hold,
            volume: hold,
        },
        generated_at: Utc::now(),
    }
}

/// Evaluate every symbol in the list against its own history. Symbols whose
/// series cannot be fetched are skipped with a warning, never failing the
/// batch.
pub fn evaluate_symbols(
    market: &dyn MarketDataPort,
    symbols: &[String],
    days: usize,
    config: &SignalConfig,
) -> Vec<Signal> {
    let mut signals = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        match market.historical_series(symbol, days) {
            Ok(series) => signals.push(evaluate(&series, config)),
            Err(e) => warn!(symbol, error = %e, "skipping symbol in bulk evaluation"),
        }
    }
    signals
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSentiment {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
    pub total: usize,
    /// (bullish - bearish) / total, in [-1, 1].
    pub score: f64,
    pub overall: String,
}

/// Summarize a batch of signals into a market-level mood.
pub fn market_sentiment(signals: &[Signal]) -> MarketSentiment {
    let bullish = signals.iter().filter(|s| s.decision == Decision::Buy).count();
    let bearish = signals.iter().filter(|s| s.decision == Decision::Sell).count();
    let neutral = signals.iter().filter(|s| s.decision == Decision::Hold).count();
    let total = signals.len();

    let score = if total > 0 {
        (bullish as f64 - bearish as f64) / total as f64
    } else {
        0.0
    };
    let overall = if score > 0.1 {
        "BULLISH"
    } else if score < -0.1 {
        "BEARISH"
    } else {
        "NEUTRAL"
    };

    MarketSentiment {
        bullish,
        bearish,
        neutral,
        total,
        score,
        overall: overall.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_series(closes: Vec<f64>, volumes: Vec<f64>) -> PriceSeries {
        let dates: Vec<NaiveDate> = (0..closes.len() as i64)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i))
            .collect();
        let open = closes.clone();
        let high: Vec<f64> = closes.iter().map(|c| c * 1.01).collect();
        let low: Vec<f64> = closes.iter().map(|c| c * 0.99).collect();
        PriceSeries::new("TEST", dates, open, high, low, closes, volumes)
    }

    fn flat_series(len: usize) -> PriceSeries {
        make_series(vec![100.0; len], vec![1000.0; len])
    }

    #[test]
    fn flat_series_holds_with_neutral_indicators() {
        let signal = evaluate(&flat_series(40), &SignalConfig::default());
        assert_eq!(signal.decision, Decision::Hold);
        assert!((signal.indicators.oscillator - 50.0).abs() < f64::EPSILON);
        assert!((signal.indicators.moving_average - 100.0).abs() < f64::EPSILON);
        assert_eq!(signal.strategies.momentum.decision, Decision::Hold);
        assert_eq!(signal.strategies.mean_reversion.decision, Decision::Hold);
    }

    #[test]
    fn empty_series_is_neutral_hold() {
        let series = make_series(vec![], vec![]);
        let signal = evaluate(&series, &SignalConfig::default());
        assert_eq!(signal.decision, Decision::Hold);
        assert!((signal.indicators.oscillator - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn momentum_fires_above_band() {
        assert_eq!(momentum_strategy(104.0, 100.0).decision, Decision::Buy);
        assert_eq!(momentum_strategy(96.0, 100.0).decision, Decision::Sell);
        assert_eq!(momentum_strategy(101.0, 100.0).decision, Decision::Hold);
    }

    #[test]
    fn mean_reversion_opposes_momentum() {
        assert_eq!(mean_reversion_strategy(93.0, 100.0).decision, Decision::Buy);
        assert_eq!(mean_reversion_strategy(107.0, 100.0).decision, Decision::Sell);
        assert_eq!(mean_reversion_strategy(104.0, 100.0).decision, Decision::Hold);
    }

    #[test]
    fn oscillator_bands() {
        assert_eq!(oscillator_strategy(20.0).decision, Decision::Buy);
        assert!((oscillator_strategy(20.0).confidence - 85.0).abs() < f64::EPSILON);
        assert_eq!(oscillator_strategy(30.0).decision, Decision::Buy);
        assert!((oscillator_strategy(30.0).confidence - 70.0).abs() < f64::EPSILON);
        assert_eq!(oscillator_strategy(80.0).decision, Decision::Sell);
        assert_eq!(oscillator_strategy(70.0).decision, Decision::Sell);
        assert_eq!(oscillator_strategy(50.0).decision, Decision::Hold);
    }

    #[test]
    fn volume_confirms_only_large_moves() {
        assert_eq!(volume_strategy(2.0, 0.03).decision, Decision::Buy);
        assert_eq!(volume_strategy(2.0, -0.03).decision, Decision::Sell);
        assert_eq!(volume_strategy(2.0, 0.01).decision, Decision::Hold);
        assert_eq!(volume_strategy(1.0, 0.05).decision, Decision::Hold);
    }

    #[test]
    fn oversold_spike_produces_buy() {
        // Steady decline leaves the oscillator deep oversold and the price
        // far below its average; final bar adds a heavy-volume drop.
        let mut closes: Vec<f64> = (0..39).map(|i| 200.0 - 3.0 * i as f64).collect();
        closes.push(70.0);
        let mut volumes = vec![1000.0; 39];
        volumes.push(5000.0);

        let signal = evaluate(&make_series(closes, volumes), &SignalConfig::default());
        assert_eq!(signal.strategies.mean_reversion.decision, Decision::Buy);
        assert_eq!(signal.strategies.oscillator.decision, Decision::Buy);
        assert_eq!(signal.decision, Decision::Buy);
        // mean-reversion 80 * 0.25 + oscillator 85 * 0.25 = 41.25
        assert!((signal.confidence - 41.0).abs() < f64::EPSILON);
    }

    #[test]
    fn threshold_forces_hold() {
        let mut closes: Vec<f64> = (0..39).map(|i| 200.0 - 3.0 * i as f64).collect();
        closes.push(70.0);
        let volumes = vec![1000.0; 40];

        let strict = SignalConfig {
            decision_threshold: 1000.0,
            ..SignalConfig::default()
        };
        let signal = evaluate(&make_series(closes, volumes), &strict);
        assert_eq!(signal.decision, Decision::Hold);
    }

    #[test]
    fn confidence_boost_is_capped() {
        let boosted = SignalConfig {
            confidence_boost: 500.0,
            ..SignalConfig::default()
        };
        let signal = evaluate(&flat_series(40), &boosted);
        // Every bucket is capped at 95, so the combined confidence is too.
        assert!(signal.confidence <= 95.0);
    }

    #[test]
    fn prefix_evaluation_ignores_later_bars() {
        // Rising tail after the prefix point must not leak into the verdict.
        let mut closes = vec![100.0; 30];
        closes.extend((0..10).map(|i| 200.0 + i as f64));
        let series = make_series(closes, vec![1000.0; 40]);

        let signal = evaluate_prefix(&series, 29, &SignalConfig::default());
        assert_eq!(signal.decision, Decision::Hold);
        assert!((signal.indicators.last_close - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sentiment_counts_and_label() {
        let mut closes: Vec<f64> = (0..39).map(|i| 200.0 - 3.0 * i as f64).collect();
        closes.push(70.0);
        let buy = evaluate(&make_series(closes, vec![1000.0; 40]), &SignalConfig::default());
        let hold = evaluate(&flat_series(40), &SignalConfig::default());

        let sentiment = market_sentiment(&[buy.clone(), buy, hold]);
        assert_eq!(sentiment.bullish, 2);
        assert_eq!(sentiment.neutral, 1);
        assert_eq!(sentiment.total, 3);
        assert_eq!(sentiment.overall, "BULLISH");

        let empty = market_sentiment(&[]);
        assert_eq!(empty.total, 0);
        assert_eq!(empty.overall, "NEUTRAL");
    }

    #[test]
    fn config_defaults_match_documented_weights() {
        let config = SignalConfig::default();
        assert!((config.momentum_weight - 0.30).abs() < f64::EPSILON);
        assert!((config.mean_reversion_weight - 0.25).abs() < f64::EPSILON);
        assert!((config.oscillator_weight - 0.25).abs() < f64::EPSILON);
        assert!((config.volume_weight - 0.20).abs() < f64::EPSILON);
        let sum = config.momentum_weight
            + config.mean_reversion_weight
            + config.oscillator_weight
            + config.volume_weight;
        assert!((sum - 1.0).abs() < f64::EPSILON);
    }
}
