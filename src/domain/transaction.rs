//! Append-only trade log entries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }

    pub fn parse(value: &str) -> Option<TradeSide> {
        match value {
            "BUY" => Some(TradeSide::Buy),
            "SELL" => Some(TradeSide::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Created exactly once per successful trade, never mutated or deleted.
/// `amount` is the cash moved: cost for a buy, revenue for a sell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub side: TradeSide,
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(side: TradeSide, symbol: &str, quantity: f64, price: f64) -> Self {
        Transaction {
            side,
            symbol: symbol.to_string(),
            quantity,
            price,
            amount: quantity * price,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_round_trips_through_str() {
        assert_eq!(TradeSide::parse("BUY"), Some(TradeSide::Buy));
        assert_eq!(TradeSide::parse("SELL"), Some(TradeSide::Sell));
        assert_eq!(TradeSide::parse("HOLD"), None);
        assert_eq!(TradeSide::Buy.to_string(), "BUY");
        assert_eq!(TradeSide::Sell.as_str(), "SELL");
    }

    #[test]
    fn amount_is_quantity_times_price() {
        let tx = Transaction::new(TradeSide::Buy, "RELIANCE", 5.0, 650.0);
        assert_eq!(tx.symbol, "RELIANCE");
        assert!((tx.amount - 3250.0).abs() < f64::EPSILON);
    }
}
