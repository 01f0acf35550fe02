//! Bounded request window for one import.

use crate::domain::error::StockDataError;
use chrono::{DateTime, NaiveDate, Utc};

pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 365;
pub const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
    ticker: String,
    num_days: u32,
}

impl FetchWindow {
    /// `ticker` must already be normalized.
    pub fn new(ticker: impl Into<String>, num_days: u32) -> Result<Self, StockDataError> {
        if !(MIN_DAYS..=MAX_DAYS).contains(&num_days) {
            return Err(StockDataError::InvalidWindow {
                days: num_days,
                min: MIN_DAYS,
                max: MAX_DAYS,
            });
        }
        Ok(Self {
            ticker: ticker.into(),
            num_days,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn num_days(&self) -> u32 {
        self.num_days
    }

    /// Unix-second bounds `(period1, period2)` relative to `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> (i64, i64) {
        let end = now.timestamp();
        let start = end - i64::from(self.num_days) * SECONDS_PER_DAY;
        (start, end)
    }

    /// The resolved bounds as UTC calendar dates, both inclusive.
    pub fn date_range(&self, now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
        let (start, _) = self.resolve(now);
        let start_date = DateTime::from_timestamp(start, 0)
            .map(|dt| dt.date_naive())
            .unwrap_or(NaiveDate::MIN);
        (start_date, now.date_naive())
    }
}
