//! Daily price record for one ticker.

use chrono::NaiveDate;

/// ISO calendar date format used on the wire and in the store.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PricePoint {
    /// close - open
    pub fn intraday_move(&self) -> f64 {
        self.close - self.open
    }

    /// open - previous close
    pub fn overnight_move(&self, prev_close: f64) -> f64 {
        self.open - prev_close
    }

    /// True when every stored field matches `other`. Used by merge to tell
    /// an update from a no-op.
    pub fn same_values(&self, other: &PricePoint) -> bool {
        self.open == other.open
            && self.high == other.high
            && self.low == other.low
            && self.close == other.close
            && self.volume == other.volume
    }

    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}
