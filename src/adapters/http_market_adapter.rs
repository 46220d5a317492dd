//! HTTP market data adapter.
//!
//! Speaks the Yahoo chart JSON shape, caches prices per symbol with a TTL,
//! and degrades to the deterministic mock data on any failure. A price
//! fetch from this adapter never surfaces an error to its caller.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::DateTime;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::error::PapertraderError;
use crate::domain::mock;
use crate::domain::series::PriceSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;

pub const DEFAULT_ENDPOINT: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const DEFAULT_SUFFIX: &str = ".NS";
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

struct CachedPrice {
    price: f64,
    fetched_at: Instant,
}

pub struct HttpMarketAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    symbol_suffix: String,
    cache_ttl: Duration,
    price_cache: Mutex<HashMap<String, CachedPrice>>,
}

impl HttpMarketAdapter {
    pub fn new(
        base_url: impl Into<String>,
        symbol_suffix: impl Into<String>,
        timeout: Duration,
        cache_ttl: Duration,
    ) -> Result<Self, PapertraderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PapertraderError::Http {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            symbol_suffix: symbol_suffix.into(),
            cache_ttl,
            price_cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PapertraderError> {
        let base_url = config
            .get_string("market", "endpoint")
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let suffix = config
            .get_string("market", "symbol_suffix")
            .unwrap_or_else(|| DEFAULT_SUFFIX.to_string());
        let timeout =
            config.get_int("market", "timeout_secs", DEFAULT_TIMEOUT_SECS as i64) as u64;
        let cache_ttl =
            config.get_int("market", "cache_ttl_secs", DEFAULT_CACHE_TTL_SECS as i64) as u64;

        Self::new(
            base_url,
            suffix,
            Duration::from_secs(timeout),
            Duration::from_secs(cache_ttl),
        )
    }

    fn fetch_json(&self, url: &str) -> Result<Value, PapertraderError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| PapertraderError::Http {
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(PapertraderError::Http {
                reason: format!("status {}", response.status()),
            });
        }
        response.json().map_err(|e| PapertraderError::Http {
            reason: e.to_string(),
        })
    }

    fn fetch_price(&self, symbol: &str) -> Result<f64, PapertraderError> {
        let url = format!(
            "{}/{}{}?interval=1m",
            self.base_url, symbol, self.symbol_suffix
        );
        let body = self.fetch_json(&url)?;
        parse_price(&body).ok_or_else(|| PapertraderError::PriceUnavailable {
            symbol: symbol.to_string(),
            reason: "price missing from chart response".into(),
        })
    }

    fn fetch_series(&self, symbol: &str, days: usize) -> Result<PriceSeries, PapertraderError> {
        let url = format!(
            "{}/{}{}?range={}&interval=1d",
            self.base_url,
            symbol,
            self.symbol_suffix,
            range_for_days(days)
        );
        let body = self.fetch_json(&url)?;
        parse_series(symbol, &body, days).ok_or_else(|| PapertraderError::PriceUnavailable {
            symbol: symbol.to_string(),
            reason: "history missing from chart response".into(),
        })
    }

    fn cached_price(&self, symbol: &str) -> Option<f64> {
        let cache = self.price_cache.lock().unwrap();
        cache.get(symbol).and_then(|entry| {
            if entry.fetched_at.elapsed() < self.cache_ttl {
                Some(entry.price)
            } else {
                None
            }
        })
    }

    fn store_price(&self, symbol: &str, price: f64) {
        let mut cache = self.price_cache.lock().unwrap();
        cache.insert(
            symbol.to_string(),
            CachedPrice {
                price,
                fetched_at: Instant::now(),
            },
        );
    }
}

impl MarketDataPort for HttpMarketAdapter {
    fn current_price(&self, symbol: &str) -> Result<f64, PapertraderError> {
        if let Some(price) = self.cached_price(symbol) {
            debug!(symbol, price, "using cached price");
            return Ok(price);
        }

        match self.fetch_price(symbol) {
            Ok(price) => {
                self.store_price(symbol, price);
                Ok(price)
            }
            Err(e) => {
                warn!(symbol, error = %e, "live price fetch failed, using mock price");
                Ok(mock::reference_price(symbol))
            }
        }
    }

    fn historical_series(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<PriceSeries, PapertraderError> {
        match self.fetch_series(symbol, days) {
            Ok(series) if !series.is_empty() => Ok(series),
            Ok(_) => {
                warn!(symbol, "empty history response, using synthetic series");
                Ok(mock::synthetic_series(symbol, days))
            }
            Err(e) => {
                warn!(symbol, error = %e, "history fetch failed, using synthetic series");
                Ok(mock::synthetic_series(symbol, days))
            }
        }
    }
}

fn range_for_days(days: usize) -> &'static str {
    match days {
        0..=30 => "1mo",
        31..=90 => "3mo",
        91..=180 => "6mo",
        181..=365 => "1y",
        _ => "2y",
    }
}

fn parse_price(body: &Value) -> Option<f64> {
    body["chart"]["result"]
        .get(0)?
        .get("meta")?
        .get("regularMarketPrice")?
        .as_f64()
}

fn parse_series(symbol: &str, body: &Value, days: usize) -> Option<PriceSeries> {
    let result = body["chart"]["result"].get(0)?;
    let timestamps = result.get("timestamp")?.as_array()?;
    let quote = result["indicators"]["quote"].get(0)?;

    let column = |name: &str| -> Option<&Vec<Value>> { quote.get(name)?.as_array() };
    let open = column("open")?;
    let high = column("high")?;
    let low = column("low")?;
    let close = column("close")?;
    let volume = column("volume")?;

    let mut dates = Vec::new();
    let mut opens = Vec::new();
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    let mut closes = Vec::new();
    let mut volumes = Vec::new();

    for (i, ts) in timestamps.iter().enumerate() {
        // Bars with a missing close are holiday/halted entries; skip them.
        let close_value = match close.get(i).and_then(Value::as_f64) {
            Some(v) => v,
            None => continue,
        };
        let seconds = ts.as_i64()?;
        let date = DateTime::from_timestamp(seconds, 0)?.date_naive();

        dates.push(date);
        closes.push(close_value);
        opens.push(open.get(i).and_then(Value::as_f64).unwrap_or(close_value));
        highs.push(high.get(i).and_then(Value::as_f64).unwrap_or(close_value));
        lows.push(low.get(i).and_then(Value::as_f64).unwrap_or(close_value));
        volumes.push(volume.get(i).and_then(Value::as_f64).unwrap_or(0.0));
    }

    let start = dates.len().saturating_sub(days);
    Some(PriceSeries::new(
        symbol,
        dates.split_off(start),
        opens.split_off(start),
        highs.split_off(start),
        lows.split_off(start),
        closes.split_off(start),
        volumes.split_off(start),
    ))
}
