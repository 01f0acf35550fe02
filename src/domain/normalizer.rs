//! Raw quote table parsing.
//!
//! Turns the CSV body returned by a quote source into [`PricePoint`]s.
//! Columns are located by header name so column order does not matter and
//! `Adj Close` is simply never read. Bad rows are counted, not fatal.

use crate::domain::error::StockDataError;
use crate::domain::price_point::{DATE_FORMAT, PricePoint};
use chrono::NaiveDate;
use csv::StringRecord;
use log::debug;

/// Unparsed tabular payload exactly as the source returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub body: String,
}

impl RawTable {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// Output of [`normalize`]: the valid points plus how many rows were dropped.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub points: Vec<PricePoint>,
    pub dropped: usize,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

/// Position of the `name` column, matched case-insensitively.
pub fn column_index(headers: &StringRecord, name: &str) -> Result<usize, StockDataError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| StockDataError::MalformedResponse {
            reason: format!("missing {name} column"),
        })
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, StockDataError> {
        let find = |name: &str| column_index(headers, name);
        Ok(Self {
            date: find("Date")?,
            open: find("Open")?,
            high: find("High")?,
            low: find("Low")?,
            close: find("Close")?,
            volume: find("Volume")?,
        })
    }
}

/// Parse `raw` into points tagged with `ticker`.
///
/// `ticker` must already be normalized. A header missing one of the required
/// columns fails the whole table; individual rows that do not validate are
/// dropped and counted.
pub fn normalize(ticker: &str, raw: &RawTable) -> Result<Normalized, StockDataError> {
    if raw.is_empty() {
        return Ok(Normalized::default());
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.body.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| StockDataError::MalformedResponse {
            reason: format!("unreadable header: {e}"),
        })?
        .clone();
    let columns = Columns::locate(&headers)?;

    let mut out = Normalized::default();
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("{ticker}: dropping row {}: {e}", line + 1);
                out.dropped += 1;
                continue;
            }
        };
        match parse_row(ticker, &columns, &record) {
            Ok(point) => out.points.push(point),
            Err(reason) => {
                debug!("{ticker}: dropping row {}: {reason}", line + 1);
                out.dropped += 1;
            }
        }
    }

    Ok(out)
}

fn parse_row(ticker: &str, cols: &Columns, record: &StringRecord) -> Result<PricePoint, String> {
    let field = |idx: usize, name: &str| record.get(idx).ok_or_else(|| format!("missing {name}"));

    let date_str = field(cols.date, "date")?;
    let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT)
        .map_err(|e| format!("invalid date {date_str:?}: {e}"))?;

    let price = |idx: usize, name: &str| -> Result<f64, String> {
        let raw = field(idx, name)?;
        let value: f64 = raw
            .parse()
            .map_err(|_| format!("invalid {name} {raw:?}"))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(format!("{name} must be positive, got {raw}"));
        }
        Ok(value)
    };

    let open = price(cols.open, "open")?;
    let high = price(cols.high, "high")?;
    let low = price(cols.low, "low")?;
    let close = price(cols.close, "close")?;

    let volume_str = field(cols.volume, "volume")?;
    let volume: i64 = volume_str
        .parse()
        .map_err(|_| format!("invalid volume {volume_str:?}"))?;
    if volume < 0 {
        return Err(format!("volume must be non-negative, got {volume}"));
    }

    Ok(PricePoint {
        ticker: ticker.to_string(),
        date,
        open,
        high,
        low,
        close,
        volume,
    })
}
