//! Backtest performance metrics.

use serde::Serialize;

use super::backtest::TradeEvent;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestMetrics {
    /// (final - initial) / initial, as a fraction.
    pub total_return: f64,
    pub absolute_return: f64,
    /// Linear extrapolation: total_return * (252 / trading days).
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline as a fraction of the peak.
    pub max_drawdown: f64,
    /// Population standard deviation of per-step returns.
    pub volatility: f64,
    pub avg_daily_return: f64,
    /// Fraction of closed (sell) trades that realized a gain. Buys stay
    /// unresolved until sold and are not counted.
    pub win_rate: f64,
    pub total_trades: usize,
    pub closed_trades: usize,
    pub profitable_trades: usize,
}

impl BacktestMetrics {
    pub fn compute(
        trades: &[TradeEvent],
        returns: &[f64],
        max_drawdown: f64,
        initial_capital: f64,
        final_value: f64,
        risk_free_rate: f64,
    ) -> Self {
        let total_return = if initial_capital > 0.0 {
            (final_value - initial_capital) / initial_capital
        } else {
            0.0
        };
        let absolute_return = final_value - initial_capital;

        let trading_days = returns.len().max(1) as f64;
        let annualized_return = total_return * (TRADING_DAYS_PER_YEAR / trading_days);

        let (avg_daily_return, volatility) = mean_and_stddev(returns);
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let sharpe_ratio = if volatility > 0.0 {
            (avg_daily_return - daily_rf) / volatility * TRADING_DAYS_PER_YEAR.sqrt()
        } else {
            0.0
        };

        let closed_trades = trades.iter().filter(|t| t.profitable.is_some()).count();
        let profitable_trades = trades
            .iter()
            .filter(|t| t.profitable == Some(true))
            .count();
        let win_rate = if closed_trades > 0 {
            profitable_trades as f64 / closed_trades as f64
        } else {
            0.0
        };

        BacktestMetrics {
            total_return,
            absolute_return,
            annualized_return,
            sharpe_ratio,
            max_drawdown,
            volatility,
            avg_daily_return,
            win_rate,
            total_trades: trades.len(),
            closed_trades,
            profitable_trades,
        }
    }
}

fn mean_and_stddev(returns: &[f64]) -> (f64, f64) {
    if returns.is_empty() {
        return (0.0, 0.0);
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
