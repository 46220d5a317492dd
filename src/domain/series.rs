//! Aligned OHLCV price series.
//!
//! Columns are stored as parallel vectors so indicator code can work on
//! plain `&[f64]` slices. Construction truncates every column to the
//! shortest one, so a series is aligned by the time anyone reads it.

use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl PriceSeries {
    pub fn new(
        symbol: impl Into<String>,
        dates: Vec<NaiveDate>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
    ) -> Self {
        let mut series = PriceSeries {
            symbol: symbol.into(),
            dates,
            open,
            high,
            low,
            close,
            volume,
        };
        let len = series
            .dates
            .len()
            .min(series.open.len())
            .min(series.high.len())
            .min(series.low.len())
            .min(series.close.len())
            .min(series.volume.len());
        series.dates.truncate(len);
        series.open.truncate(len);
        series.high.truncate(len);
        series.low.truncate(len);
        series.close.truncate(len);
        series.volume.truncate(len);
        series
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn latest_close(&self) -> Option<f64> {
        self.close.last().copied()
    }

    /// Close-to-close change at `index`, as a fraction of the prior close.
    /// Zero for the first bar (there is no prior close).
    pub fn daily_change(&self, index: usize) -> f64 {
        if index == 0 || index >= self.len() {
            return 0.0;
        }
        let prev = self.close[index - 1];
        if prev == 0.0 {
            return 0.0;
        }
        (self.close[index] - prev) / prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sample_series() -> PriceSeries {
        PriceSeries::new(
            "TCS",
            vec![day(1), day(2), day(3)],
            vec![99.0, 101.0, 103.0],
            vec![102.0, 104.0, 106.0],
            vec![98.0, 100.0, 102.0],
            vec![100.0, 102.0, 104.0],
            vec![1000.0, 1100.0, 1200.0],
        )
    }

    #[test]
    fn aligned_series_keeps_full_length() {
        let series = sample_series();
        assert_eq!(series.len(), 3);
        assert!(!series.is_empty());
    }

    #[test]
    fn misaligned_columns_truncate_to_shortest() {
        let series = PriceSeries::new(
            "TCS",
            vec![day(1), day(2), day(3)],
            vec![99.0, 101.0],
            vec![102.0, 104.0, 106.0],
            vec![98.0, 100.0, 102.0],
            vec![100.0, 102.0, 104.0],
            vec![1000.0, 1100.0, 1200.0],
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series.dates.len(), 2);
        assert_eq!(series.volume.len(), 2);
    }

    #[test]
    fn latest_close() {
        assert_eq!(sample_series().latest_close(), Some(104.0));

        let empty = PriceSeries::new("X", vec![], vec![], vec![], vec![], vec![], vec![]);
        assert_eq!(empty.latest_close(), None);
    }

    #[test]
    fn daily_change_fraction() {
        let series = sample_series();
        assert!((series.daily_change(1) - 0.02).abs() < 1e-12);
        assert!((series.daily_change(0) - 0.0).abs() < f64::EPSILON);
        assert!((series.daily_change(99) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn daily_change_zero_prior_close() {
        let series = PriceSeries::new(
            "X",
            vec![day(1), day(2)],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
        );
        assert!((series.daily_change(1) - 0.0).abs() < f64::EPSILON);
    }
}
