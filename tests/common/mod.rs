#![allow(dead_code)]

use chrono::NaiveDate;
pub use stockdata::domain::price_point::PricePoint;
use stockdata::domain::error::FetchError;
use stockdata::domain::fetch_window::FetchWindow;
use stockdata::domain::normalizer::RawTable;
use stockdata::ports::quote_port::QuotePort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

pub const HEADER: &str = "Date,Open,High,Low,Close,Adj Close,Volume";

/// Quote source serving canned bodies per ticker. Unknown tickers are not found.
pub struct MockQuotePort {
    pub tables: HashMap<String, String>,
    pub errors: HashMap<String, FetchError>,
    pub calls: RefCell<Vec<FetchWindow>>,
}

impl MockQuotePort {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            errors: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_table(mut self, ticker: &str, body: String) -> Self {
        self.tables.insert(ticker.to_string(), body);
        self
    }

    pub fn with_error(mut self, ticker: &str, err: FetchError) -> Self {
        self.errors.insert(ticker.to_string(), err);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl QuotePort for MockQuotePort {
    fn fetch(&self, window: &FetchWindow) -> Result<RawTable, FetchError> {
        self.calls.borrow_mut().push(window.clone());
        if let Some(err) = self.errors.get(window.ticker()) {
            return Err(err.clone());
        }
        match self.tables.get(window.ticker()) {
            Some(body) => Ok(RawTable::new(body.clone())),
            None => Err(FetchError::TickerNotFound {
                ticker: window.ticker().to_string(),
            }),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_point(ticker: &str, date: &str, close: f64) -> PricePoint {
    PricePoint {
        ticker: ticker.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    }
}

pub fn generate_points(
    ticker: &str,
    start_date: NaiveDate,
    count: usize,
    start_price: f64,
) -> Vec<PricePoint> {
    (0..count)
        .map(|i| PricePoint {
            ticker: ticker.to_string(),
            date: start_date + chrono::Duration::days(i as i64),
            open: start_price + i as f64,
            high: start_price + i as f64 + 1.0,
            low: start_price + i as f64 - 1.0,
            close: start_price + i as f64 + 0.5,
            volume: 1000 + i as i64,
        })
        .collect()
}

/// Render points the way the download endpoint does, adjusted close included.
pub fn csv_body(points: &[PricePoint]) -> String {
    let mut body = format!("{HEADER}\n");
    for p in points {
        body.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            p.date_string(),
            p.open,
            p.high,
            p.low,
            p.close,
            p.close * 0.99,
            p.volume
        ));
    }
    body
}

/// Serve exactly one HTTP response on a loopback port.
///
/// Returns a base URL to configure the adapter with and a handle yielding the
/// request line the server saw.
pub fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut line = String::new();
            let n = reader.read_line(&mut line).unwrap();
            if n == 0 || line == "\r\n" {
                break;
            }
        }

        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        request_line
    });

    (format!("http://{addr}/v7/finance/download"), handle)
}

/// Accept one connection and hold it open without replying until `hold` elapses.
pub fn serve_silently(hold: std::time::Duration) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let (_stream, _) = listener.accept().unwrap();
        thread::sleep(hold);
    });

    (format!("http://{addr}/v7/finance/download"), handle)
}

/// A loopback URL nothing is listening on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/v7/finance/download")
}
