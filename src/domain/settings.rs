//! Validated runtime settings.
//!
//! Built once from a [`ConfigPort`] at startup; every value has a default so
//! running without a config file reproduces the classic behaviour (a
//! `Stock_Data.db` in the working directory and the public download endpoint).

use crate::domain::error::StockDataError;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STORE_PATH: &str = "Stock_Data.db";
pub const DEFAULT_POOL_SIZE: u32 = 4;
pub const MAX_POOL_SIZE: u32 = 64;
pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/download";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub store_path: PathBuf,
    pub pool_size: u32,
    pub base_url: String,
    pub user_agent: Option<String>,
    /// `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
    pub chart_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            pool_size: DEFAULT_POOL_SIZE,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
            timeout: None,
            chart_dir: PathBuf::from("."),
        }
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StockDataError {
    StockDataError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn read_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<i64>, StockDataError> {
    match config.get_int(section, key) {
        None => Ok(None),
        Some(Ok(v)) => Ok(Some(v)),
        Some(Err(raw)) => Err(invalid(section, key, format!("{raw:?} is not an integer"))),
    }
}

impl Settings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockDataError> {
        let defaults = Settings::default();

        let store_path = config
            .get_string("store", "path")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        let pool_size = match read_int(config, "store", "pool_size")? {
            None => defaults.pool_size,
            Some(v) if (1..=i64::from(MAX_POOL_SIZE)).contains(&v) => v as u32,
            Some(_) => {
                return Err(invalid(
                    "store",
                    "pool_size",
                    format!("pool_size must be between 1 and {MAX_POOL_SIZE}"),
                ));
            }
        };

        let base_url = config
            .get_string("yahoo", "base_url")
            .unwrap_or(defaults.base_url);
        let parsed = reqwest::Url::parse(&base_url)
            .map_err(|e| invalid("yahoo", "base_url", e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("yahoo", "base_url", "base_url must be http or https"));
        }

        let timeout = match read_int(config, "yahoo", "timeout_secs")? {
            None => None,
            Some(v) if v > 0 => Some(Duration::from_secs(v as u64)),
            Some(_) => {
                return Err(invalid(
                    "yahoo",
                    "timeout_secs",
                    "timeout_secs must be positive",
                ));
            }
        };

        Ok(Self {
            store_path,
            pool_size,
            base_url,
            user_agent: config.get_string("yahoo", "user_agent"),
            timeout,
            chart_dir: config
                .get_string("output", "chart_dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.chart_dir),
        })
    }
}
