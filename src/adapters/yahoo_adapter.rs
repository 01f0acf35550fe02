//! Yahoo Finance CSV download adapter.
//!
//! Issues one blocking GET per fetch against the historical download
//! endpoint and hands back the body untouched. There is no retry loop and
//! no timeout beyond what the client is configured with.

use crate::domain::error::{FetchError, StockDataError};
use crate::domain::fetch_window::FetchWindow;
use crate::domain::normalizer::RawTable;
use crate::domain::settings::Settings;
use crate::ports::quote_port::QuotePort;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};

const DEFAULT_USER_AGENT: &str = concat!("stockdata/", env!("CARGO_PKG_VERSION"));

pub struct YahooAdapter {
    client: Client,
    base_url: Url,
}

fn connectivity(e: reqwest::Error) -> FetchError {
    FetchError::Connectivity {
        reason: e.to_string(),
    }
}

/// Map a response status to the fetch error taxonomy.
pub fn classify_status(ticker: &str, status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::NOT_FOUND {
        Err(FetchError::TickerNotFound {
            ticker: ticker.to_string(),
        })
    } else {
        Err(FetchError::UnexpectedStatus {
            ticker: ticker.to_string(),
            status: status.as_u16(),
        })
    }
}

impl YahooAdapter {
    pub fn from_settings(settings: &Settings) -> Result<Self, StockDataError> {
        let invalid_url = |reason: String| StockDataError::ConfigInvalid {
            section: "yahoo".into(),
            key: "base_url".into(),
            reason,
        };

        let base_url = Url::parse(&settings.base_url).map_err(|e| invalid_url(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid_url("base_url cannot take a path".into()));
        }

        let user_agent = settings
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        // local mirrors bypass any system proxy
        if matches!(base_url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]")) {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(std::io::Error::other)?;

        Ok(Self { client, base_url })
    }

    /// `{base}/{TICKER}?period1=..&period2=..&interval=1d&events=history&includeAdjustedClose=true`
    pub fn request_url(&self, window: &FetchWindow, now: DateTime<Utc>) -> Url {
        let (period1, period2) = window.resolve(now);
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(window.ticker());
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history")
            .append_pair("includeAdjustedClose", "true");
        url
    }

    /// Fetch relative to an explicit `now`.
    pub fn fetch_at(&self, window: &FetchWindow, now: DateTime<Utc>) -> Result<RawTable, FetchError> {
        let url = self.request_url(window, now);
        debug!("GET {url}");

        let resp = self.client.get(url).send().map_err(connectivity)?;
        classify_status(window.ticker(), resp.status())?;

        let body = resp.text().map_err(connectivity)?;
        debug!("{}: received {} bytes", window.ticker(), body.len());
        Ok(RawTable::new(body))
    }
}

impl QuotePort for YahooAdapter {
    fn fetch(&self, window: &FetchWindow) -> Result<RawTable, FetchError> {
        self.fetch_at(window, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn adapter(base_url: &str) -> YahooAdapter {
        let settings = Settings {
            base_url: base_url.to_string(),
            ..Settings::default()
        };
        YahooAdapter::from_settings(&settings).unwrap()
    }

    #[test]
    fn request_url_carries_window_and_flags() {
        let adapter = adapter("https://query1.finance.yahoo.com/v7/finance/download");
        let window = FetchWindow::new("AAPL", 5).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let url = adapter.request_url(&window, now);

        assert_eq!(url.path(), "/v7/finance/download/AAPL");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let end = now.timestamp();
        assert_eq!(
            pairs,
            vec![
                ("period1".to_string(), (end - 5 * 86_400).to_string()),
                ("period2".to_string(), end.to_string()),
                ("interval".to_string(), "1d".to_string()),
                ("events".to_string(), "history".to_string()),
                ("includeAdjustedClose".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn request_url_handles_trailing_slash() {
        let adapter = adapter("http://localhost:8080/download/");
        let window = FetchWindow::new("BRK-B", 1).unwrap();
        let url = adapter.request_url(&window, Utc::now());
        assert_eq!(url.path(), "/download/BRK-B");
    }

    #[test]
    fn classify_404_as_not_found() {
        assert_eq!(
            classify_status("ZZZZINVALID", StatusCode::NOT_FOUND),
            Err(FetchError::TickerNotFound {
                ticker: "ZZZZINVALID".into()
            })
        );
    }

    #[test]
    fn classify_other_failures_as_unexpected() {
        assert_eq!(
            classify_status("ABC", StatusCode::TOO_MANY_REQUESTS),
            Err(FetchError::UnexpectedStatus {
                ticker: "ABC".into(),
                status: 429
            })
        );
        assert!(classify_status("ABC", StatusCode::OK).is_ok());
    }

    #[test]
    fn rejects_non_base_url() {
        let settings = Settings {
            base_url: "mailto:quotes@example.com".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            YahooAdapter::from_settings(&settings),
            Err(StockDataError::ConfigInvalid { .. })
        ));
    }
}
