//! Price store port trait.

use crate::domain::error::StockDataError;
use crate::domain::merge::MergeResult;
use crate::domain::price_point::PricePoint;
use chrono::NaiveDate;

pub trait PriceStore {
    /// Upsert by (ticker, date). All-or-nothing per call.
    fn merge(&self, points: &[PricePoint]) -> Result<MergeResult, StockDataError>;

    /// The most recent `limit` points for `ticker`, oldest first.
    fn query(&self, ticker: &str, limit: usize) -> Result<Vec<PricePoint>, StockDataError>;

    fn row_count(&self) -> Result<usize, StockDataError>;

    fn tickers(&self) -> Result<Vec<String>, StockDataError>;

    /// First date, last date and row count for `ticker`, or `None` if absent.
    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockDataError>;
}
