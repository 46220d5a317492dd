//! Market data access port trait.

use crate::domain::error::PapertraderError;
use crate::domain::series::PriceSeries;

pub trait MarketDataPort {
    /// Latest traded price for a symbol.
    fn current_price(&self, symbol: &str) -> Result<f64, PapertraderError>;

    /// Daily OHLCV history covering roughly the last `days` trading days.
    fn historical_series(&self, symbol: &str, days: usize)
        -> Result<PriceSeries, PapertraderError>;
}
