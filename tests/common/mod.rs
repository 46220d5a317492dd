//! Shared test helpers: deterministic series builders and a mock market port.
#![allow(dead_code)]

use std::collections::HashMap;

use chrono::NaiveDate;
use papertrader::domain::error::PapertraderError;
use papertrader::domain::series::PriceSeries;
use papertrader::ports::market_data_port::MarketDataPort;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn make_series(symbol: &str, closes: &[f64]) -> PriceSeries {
    make_series_with_volume(symbol, closes, &vec![1_000_000.0; closes.len()])
}

pub fn make_series_with_volume(symbol: &str, closes: &[f64], volumes: &[f64]) -> PriceSeries {
    let dates: Vec<NaiveDate> = (0..closes.len() as i64)
        .map(|i| date(2024, 1, 1) + chrono::Duration::days(i))
        .collect();
    let open = closes.to_vec();
    let high: Vec<f64> = closes.iter().map(|c| c * 1.01).collect();
    let low: Vec<f64> = closes.iter().map(|c| c * 0.99).collect();
    PriceSeries::new(
        symbol,
        dates,
        open,
        high,
        low,
        closes.to_vec(),
        volumes.to_vec(),
    )
}

/// Linear trend: `start`, `start + step`, ... for `len` bars.
pub fn trending_series(symbol: &str, len: usize, start: f64, step: f64) -> PriceSeries {
    let closes: Vec<f64> = (0..len).map(|i| start + step * i as f64).collect();
    make_series(symbol, &closes)
}

/// Canned market data port for tests.
#[derive(Default)]
pub struct MockMarket {
    prices: HashMap<String, f64>,
    series: HashMap<String, PriceSeries>,
}

impl MockMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn with_series(mut self, symbol: &str, series: PriceSeries) -> Self {
        self.series.insert(symbol.to_string(), series);
        self
    }
}

impl MarketDataPort for MockMarket {
    fn current_price(&self, symbol: &str) -> Result<f64, PapertraderError> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| PapertraderError::PriceUnavailable {
                symbol: symbol.to_string(),
                reason: "not quoted".into(),
            })
    }

    fn historical_series(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<PriceSeries, PapertraderError> {
        let series =
            self.series
                .get(symbol)
                .cloned()
                .ok_or_else(|| PapertraderError::PriceUnavailable {
                    symbol: symbol.to_string(),
                    reason: "no history".into(),
                })?;
        if series.len() <= days {
            return Ok(series);
        }
        let start = series.len() - days;
        Ok(PriceSeries::new(
            symbol,
            series.dates[start..].to_vec(),
            series.open[start..].to_vec(),
            series.high[start..].to_vec(),
            series.low[start..].to_vec(),
            series.close[start..].to_vec(),
            series.volume[start..].to_vec(),
        ))
    }
}
