//! CSV file market data adapter.
//!
//! One `{SYMBOL}.csv` per symbol with `date,open,high,low,close,volume`
//! columns. Useful for offline work and reproducible backtests.

use crate::domain::error::PapertraderError;
use crate::domain::series::PriceSeries;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvMarketAdapter {
    base_path: PathBuf,
}

impl CsvMarketAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn read_rows(&self, symbol: &str) -> Result<Vec<Row>, PapertraderError> {
        let path = self.csv_path(symbol);
        let content =
            fs::read_to_string(&path).map_err(|e| PapertraderError::PriceUnavailable {
                symbol: symbol.to_string(),
                reason: format!("failed to read {}: {}", path.display(), e),
            })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut rows = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| PapertraderError::PriceUnavailable {
                symbol: symbol.to_string(),
                reason: format!("CSV parse error: {}", e),
            })?;

            let field = |i: usize, name: &str| -> Result<&str, PapertraderError> {
                record.get(i).ok_or_else(|| PapertraderError::PriceUnavailable {
                    symbol: symbol.to_string(),
                    reason: format!("missing {} column", name),
                })
            };
            let number = |i: usize, name: &str| -> Result<f64, PapertraderError> {
                field(i, name)?
                    .parse()
                    .map_err(|e| PapertraderError::PriceUnavailable {
                        symbol: symbol.to_string(),
                        reason: format!("invalid {} value: {}", name, e),
                    })
            };

            let date = NaiveDate::parse_from_str(field(0, "date")?, "%Y-%m-%d").map_err(|e| {
                PapertraderError::PriceUnavailable {
                    symbol: symbol.to_string(),
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            rows.push(Row {
                date,
                open: number(1, "open")?,
                high: number(2, "high")?,
                low: number(3, "low")?,
                close: number(4, "close")?,
                volume: number(5, "volume")?,
            });
        }

        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }
}

struct Row {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl MarketDataPort for CsvMarketAdapter {
    fn current_price(&self, symbol: &str) -> Result<f64, PapertraderError> {
        let rows = self.read_rows(symbol)?;
        rows.last()
            .map(|r| r.close)
            .ok_or_else(|| PapertraderError::PriceUnavailable {
                symbol: symbol.to_string(),
                reason: "empty data file".into(),
            })
    }

    fn historical_series(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<PriceSeries, PapertraderError> {
        let rows = self.read_rows(symbol)?;
        let start = rows.len().saturating_sub(days);
        let window = &rows[start..];

        Ok(PriceSeries::new(
            symbol,
            window.iter().map(|r| r.date).collect(),
            window.iter().map(|r| r.open).collect(),
            window.iter().map(|r| r.high).collect(),
            window.iter().map(|r| r.low).collect(),
            window.iter().map(|r| r.close).collect(),
            window.iter().map(|r| r.volume).collect(),
        ))
    }
}
