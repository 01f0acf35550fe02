//! Import pipeline: fetch, normalize, merge.
//!
//! The pipeline owns no state of its own. It borrows a quote source and a
//! store handed to it at construction, so the same open store can be shared
//! with the read side (analysis, `show`) for the life of the process.

use crate::domain::error::StockDataError;
use crate::domain::fetch_window::FetchWindow;
use crate::domain::merge::MergeResult;
use crate::domain::normalizer::normalize;
use crate::domain::ticker::normalize_ticker;
use crate::ports::quote_port::QuotePort;
use crate::ports::store_port::PriceStore;
use log::{info, warn};

/// Successful import outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Normalized ticker the rows were stored under.
    pub ticker: String,
    pub merge: MergeResult,
    /// Rows rejected by validation.
    pub dropped: usize,
}

pub struct Pipeline<'a> {
    quotes: &'a dyn QuotePort,
    store: &'a dyn PriceStore,
}

impl<'a> Pipeline<'a> {
    pub fn new(quotes: &'a dyn QuotePort, store: &'a dyn PriceStore) -> Self {
        Self { quotes, store }
    }

    pub fn store(&self) -> &'a dyn PriceStore {
        self.store
    }

    /// Import the last `num_days` of history for `ticker` into the store.
    ///
    /// The store is only touched once a fetch succeeded and produced at least
    /// one valid row.
    pub fn import_history(&self, ticker: &str, num_days: u32) -> Result<ImportReport, StockDataError> {
        let ticker = normalize_ticker(ticker)?;
        let window = FetchWindow::new(ticker.clone(), num_days)?;

        info!("importing {num_days} days of {ticker}");
        let raw = self.quotes.fetch(&window).inspect_err(|e| {
            warn!("{ticker}: fetch failed: {e}");
        })?;

        let normalized = normalize(&ticker, &raw)?;
        if normalized.dropped > 0 {
            warn!("{ticker}: dropped {} invalid rows", normalized.dropped);
        }
        if normalized.points.is_empty() {
            return Err(StockDataError::EmptyResult {
                ticker,
                dropped: normalized.dropped,
            });
        }

        let merge = self.store.merge(&normalized.points)?;
        info!("{ticker}: {merge}");

        Ok(ImportReport {
            ticker,
            merge,
            dropped: normalized.dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite_store::SqliteStore;
    use crate::domain::error::FetchError;
    use crate::domain::normalizer::RawTable;
    use std::cell::RefCell;

    struct CannedSource {
        result: Result<RawTable, FetchError>,
        seen: RefCell<Vec<FetchWindow>>,
    }

    impl CannedSource {
        fn body(body: &str) -> Self {
            Self {
                result: Ok(RawTable::new(body)),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn failing(err: FetchError) -> Self {
            Self {
                result: Err(err),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl QuotePort for CannedSource {
        fn fetch(&self, window: &FetchWindow) -> Result<RawTable, FetchError> {
            self.seen.borrow_mut().push(window.clone());
            self.result.clone()
        }
    }

    const ROWS: &str = "Date,Open,High,Low,Close,Adj Close,Volume\n\
        2024-01-15,100.0,110.0,90.0,105.0,105.0,50000\n\
        2024-01-16,105.0,115.0,100.0,110.0,110.0,60000\n";

    #[test]
    fn normalizes_ticker_before_fetch() {
        let source = CannedSource::body(ROWS);
        let store = SqliteStore::in_memory().unwrap();
        let report = Pipeline::new(&source, &store).import_history(" $abc ", 5).unwrap();

        assert_eq!(report.ticker, "ABC");
        assert_eq!(source.seen.borrow()[0].ticker(), "ABC");
        assert_eq!(source.seen.borrow()[0].num_days(), 5);
        assert_eq!(store.query("ABC", 5).unwrap().len(), 2);
    }

    #[test]
    fn invalid_input_never_reaches_source() {
        let source = CannedSource::body(ROWS);
        let store = SqliteStore::in_memory().unwrap();
        let pipeline = Pipeline::new(&source, &store);

        assert!(matches!(
            pipeline.import_history("", 5),
            Err(StockDataError::InvalidTicker { .. })
        ));
        assert!(matches!(
            pipeline.import_history("ABC", 0),
            Err(StockDataError::InvalidWindow { .. })
        ));
        assert!(source.seen.borrow().is_empty());
    }

    #[test]
    fn connectivity_failure_leaves_store_alone() {
        let source = CannedSource::failing(FetchError::Connectivity {
            reason: "connection refused".into(),
        });
        let store = SqliteStore::in_memory().unwrap();
        let err = Pipeline::new(&source, &store)
            .import_history("ABC", 5)
            .unwrap_err();

        assert!(matches!(
            err,
            StockDataError::Fetch(FetchError::Connectivity { .. })
        ));
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn all_rows_invalid_is_empty_result() {
        let source = CannedSource::body(
            "Date,Open,High,Low,Close,Adj Close,Volume\n\
             2024-01-13,null,null,null,null,null,null\n\
             2024-01-14,null,null,null,null,null,null\n",
        );
        let store = SqliteStore::in_memory().unwrap();
        let err = Pipeline::new(&source, &store)
            .import_history("ABC", 2)
            .unwrap_err();

        match err {
            StockDataError::EmptyResult { ticker, dropped } => {
                assert_eq!(ticker, "ABC");
                assert_eq!(dropped, 2);
            }
            other => panic!("expected EmptyResult, got: {other}"),
        }
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn dropped_rows_are_reported() {
        let source = CannedSource::body(&format!("{ROWS}2024-01-17,1.0,1.0,1.0,0.0,0.0,10\n"));
        let store = SqliteStore::in_memory().unwrap();
        let report = Pipeline::new(&source, &store).import_history("ABC", 5).unwrap();

        assert_eq!(report.dropped, 1);
        assert_eq!(report.merge.inserted, 2);
    }
}
