//! Offline quote source backed by saved download files.
//!
//! Reads `<base_path>/<TICKER>.csv` files in the same format the remote
//! endpoint returns and serves the rows that fall inside the requested
//! window. Useful for replaying earlier downloads without network access.

use crate::domain::error::FetchError;
use crate::domain::fetch_window::FetchWindow;
use crate::domain::normalizer::{RawTable, column_index};
use crate::domain::price_point::DATE_FORMAT;
use crate::ports::quote_port::QuotePort;
use chrono::{DateTime, NaiveDate, Utc};
use csv::StringRecord;
use log::debug;
use std::fmt::Display;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct CsvSourceAdapter {
    base_path: PathBuf,
    as_of: Option<DateTime<Utc>>,
}

impl CsvSourceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            as_of: None,
        }
    }

    /// Resolve windows against a fixed instant instead of the wall clock.
    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}.csv"))
    }
}

fn read_error(path: &Path, e: impl Display) -> FetchError {
    FetchError::Connectivity {
        reason: format!("failed to read {}: {}", path.display(), e),
    }
}

fn in_window(record: &StringRecord, date_col: usize, start: NaiveDate, end: NaiveDate) -> bool {
    let Some(field) = record.get(date_col) else {
        return true;
    };
    match NaiveDate::parse_from_str(field, DATE_FORMAT) {
        Ok(date) => date >= start && date <= end,
        // leave it for the normalizer to count
        Err(_) => true,
    }
}

impl QuotePort for CsvSourceAdapter {
    fn fetch(&self, window: &FetchWindow) -> Result<RawTable, FetchError> {
        let path = self.csv_path(window.ticker());
        let file = File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::TickerNotFound {
                ticker: window.ticker().to_string(),
            },
            _ => read_error(&path, e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);
        let headers = rdr.headers().map_err(|e| read_error(&path, e))?.clone();
        if headers.is_empty() {
            return Ok(RawTable::new(String::new()));
        }
        // without a Date column the table is served whole and rejected downstream
        let date_col = column_index(&headers, "Date").ok();

        let (start, end) = window.date_range(self.as_of.unwrap_or_else(Utc::now));
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        wtr.write_record(&headers).map_err(|e| read_error(&path, e))?;

        let mut served = 0usize;
        for result in rdr.records() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    debug!("{}: skipping unreadable record: {e}", path.display());
                    continue;
                }
            };
            if date_col.is_none_or(|col| in_window(&record, col, start, end)) {
                wtr.write_record(&record).map_err(|e| read_error(&path, e))?;
                served += 1;
            }
        }

        let bytes = wtr.into_inner().map_err(|e| read_error(&path, e.error()))?;
        let body = String::from_utf8(bytes).map_err(|e| read_error(&path, e))?;

        debug!(
            "{}: served {served} rows for {}-day window {start}..={end} from {}",
            window.ticker(),
            window.num_days(),
            path.display()
        );
        Ok(RawTable::new(body))
    }
}
