//! SQLite price store.
//!
//! Rows live in a single `Yahoo_Data` table keyed logically by
//! (Ticker, Date). Merges are per-key upserts inside one `BEGIN IMMEDIATE`
//! transaction, serialized by an in-process lock; readers take their own
//! pooled connection and only ever see committed state.

use crate::domain::error::StockDataError;
use crate::domain::merge::{MergeResult, dedup_batch};
use crate::domain::price_point::{DATE_FORMAT, PricePoint};
use crate::domain::settings::Settings;
use crate::ports::store_port::PriceStore;
use chrono::NaiveDate;
use log::{debug, info, warn};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Row, TransactionBehavior, params};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    write_lock: Mutex<()>,
}

fn parse_date(date_str: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            date_str.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

fn row_to_point(row: &Row<'_>) -> Result<PricePoint, rusqlite::Error> {
    let date_str: String = row.get(1)?;
    Ok(PricePoint {
        ticker: row.get(0)?,
        date: parse_date(&date_str)?,
        open: row.get(2)?,
        high: row.get(3)?,
        low: row.get(4)?,
        close: row.get(5)?,
        volume: row.get(6)?,
    })
}

/// Like [`row_to_point`], but `None` for a row with a NULL price or volume.
fn row_to_complete_point(row: &Row<'_>) -> Result<Option<PricePoint>, rusqlite::Error> {
    let values: (Option<f64>, Option<f64>, Option<f64>, Option<f64>, Option<i64>) =
        (row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?);
    match values {
        (Some(open), Some(high), Some(low), Some(close), Some(volume)) => {
            let date_str: String = row.get(1)?;
            Ok(Some(PricePoint {
                ticker: row.get(0)?,
                date: parse_date(&date_str)?,
                open,
                high,
                low,
                close,
                volume,
            }))
        }
        _ => Ok(None),
    }
}

// Older tables were created without NOT NULL and may hold empty cells.
const COMPLETE_ROW: &str = "Open IS NOT NULL AND High IS NOT NULL AND Low IS NOT NULL \
     AND Close IS NOT NULL AND Volume IS NOT NULL";

impl SqliteStore {
    pub fn from_settings(settings: &Settings) -> Result<Self, StockDataError> {
        Self::open(&settings.store_path, settings.pool_size)
    }

    /// Open (creating if needed) the database file at `path` and ensure the schema.
    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> Result<Self, StockDataError> {
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(|c| {
            c.busy_timeout(BUSY_TIMEOUT)?;
            c.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))
        });
        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        let store = Self {
            pool,
            write_lock: Mutex::new(()),
        };
        store.initialize_schema()?;
        info!("opened store {}", path.as_ref().display());
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, StockDataError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;

        let store = Self {
            pool,
            write_lock: Mutex::new(()),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, StockDataError> {
        Ok(self.pool.get()?)
    }

    pub fn initialize_schema(&self) -> Result<(), StockDataError> {
        let conn = self.connection()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS Yahoo_Data (
                Ticker TEXT NOT NULL,
                Date TEXT NOT NULL,
                Open REAL NOT NULL,
                High REAL NOT NULL,
                Low REAL NOT NULL,
                Close REAL NOT NULL,
                Volume INTEGER NOT NULL
            );",
        )?;

        // Older tables may hold duplicate keys. Keep the last written row.
        let collapsed = conn.execute(
            "DELETE FROM Yahoo_Data WHERE rowid NOT IN
                 (SELECT MAX(rowid) FROM Yahoo_Data GROUP BY Ticker, Date)",
            [],
        )?;
        if collapsed > 0 {
            warn!("removed {collapsed} duplicate (Ticker, Date) rows");
        }

        if let Err(e) = conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_yahoo_data_key ON Yahoo_Data(Ticker, Date)",
            [],
        ) {
            warn!("could not create unique (Ticker, Date) index: {e}");
        }

        Ok(())
    }
}

impl PriceStore for SqliteStore {
    fn merge(&self, points: &[PricePoint]) -> Result<MergeResult, StockDataError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StockDataError::Database {
                reason: "store write lock poisoned".into(),
            })?;

        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut result = MergeResult::default();

        {
            let mut select = tx.prepare_cached(
                "SELECT Ticker, Date, Open, High, Low, Close, Volume
                 FROM Yahoo_Data WHERE Ticker = ?1 AND Date = ?2",
            )?;
            let mut insert = tx.prepare_cached(
                "INSERT INTO Yahoo_Data (Ticker, Date, Open, High, Low, Close, Volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            let mut delete =
                tx.prepare_cached("DELETE FROM Yahoo_Data WHERE Ticker = ?1 AND Date = ?2")?;

            for point in dedup_batch(points) {
                let date = point.date_string();
                let existing = select
                    .query_map(params![point.ticker, date], row_to_complete_point)?
                    .collect::<Result<Vec<_>, _>>()?;

                let values = params![
                    point.ticker,
                    date,
                    point.open,
                    point.high,
                    point.low,
                    point.close,
                    point.volume
                ];

                match existing.as_slice() {
                    [] => {
                        insert.execute(values)?;
                        result.inserted += 1;
                    }
                    [Some(stored)] if stored.same_values(point) => result.unchanged += 1,
                    // revised values, duplicate keys or incomplete rows: one fresh row
                    _ => {
                        delete.execute(params![point.ticker, date])?;
                        insert.execute(values)?;
                        result.updated += 1;
                    }
                }
            }
        }

        tx.commit()?;
        debug!("merge committed: {result}");
        Ok(result)
    }

    fn query(&self, ticker: &str, limit: usize) -> Result<Vec<PricePoint>, StockDataError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let conn = self.connection()?;

        let mut stmt = conn.prepare_cached(&format!(
            "SELECT Ticker, Date, Open, High, Low, Close, Volume
             FROM Yahoo_Data
             WHERE Ticker = ?1 AND {COMPLETE_ROW}
             ORDER BY Date DESC
             LIMIT ?2"
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![ticker, limit], row_to_point)?;

        let mut points = rows.collect::<Result<Vec<_>, _>>()?;
        points.reverse();
        Ok(points)
    }

    fn row_count(&self) -> Result<usize, StockDataError> {
        let conn = self.connection()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM Yahoo_Data WHERE {COMPLETE_ROW}"),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn tickers(&self) -> Result<Vec<String>, StockDataError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT Ticker FROM Yahoo_Data WHERE {COMPLETE_ROW} ORDER BY Ticker"
        ))?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockDataError> {
        let conn = self.connection()?;

        let result: (Option<String>, Option<String>, i64) = conn.query_row(
            &format!(
                "SELECT MIN(Date), MAX(Date), COUNT(*) FROM Yahoo_Data
                 WHERE Ticker = ?1 AND {COMPLETE_ROW}"
            ),
            params![ticker],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => Ok(Some((
                parse_date(&min_str)?,
                parse_date(&max_str)?,
                count as usize,
            ))),
            _ => Ok(None),
        }
    }
}
