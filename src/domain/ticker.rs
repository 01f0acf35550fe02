//! Ticker symbol normalization.
//!
//! User-typed symbols are untrusted. Every path into the fetcher or the
//! store goes through [`normalize_ticker`] first.

use crate::domain::error::StockDataError;

pub const MAX_TICKER_LEN: usize = 16;

fn allowed(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '^' | '=')
}

/// Trim, strip a leading `$`, uppercase, then check length and charset.
pub fn normalize_ticker(input: &str) -> Result<String, StockDataError> {
    let trimmed = input.trim();
    let stripped = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
    let ticker = stripped.to_uppercase();

    let invalid = |reason: &str| StockDataError::InvalidTicker {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if ticker.is_empty() {
        return Err(invalid("ticker is empty"));
    }
    if ticker.len() > MAX_TICKER_LEN {
        return Err(invalid("ticker is too long"));
    }
    if let Some(c) = ticker.chars().find(|&c| !allowed(c)) {
        return Err(invalid(&format!("unexpected character {c:?}")));
    }

    Ok(ticker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercases_and_trims() {
        assert_eq!(normalize_ticker("  aapl ").unwrap(), "AAPL");
    }

    #[test]
    fn strips_currency_prefix() {
        assert_eq!(normalize_ticker("$msft").unwrap(), "MSFT");
    }

    #[test]
    fn keeps_index_and_fx_symbols() {
        assert_eq!(normalize_ticker("^gspc").unwrap(), "^GSPC");
        assert_eq!(normalize_ticker("eurusd=x").unwrap(), "EURUSD=X");
        assert_eq!(normalize_ticker("brk-b").unwrap(), "BRK-B");
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            normalize_ticker("  "),
            Err(StockDataError::InvalidTicker { .. })
        ));
        assert!(normalize_ticker("$").is_err());
    }

    #[test]
    fn rejects_sql_and_path_characters() {
        assert!(normalize_ticker("ABC'; DROP TABLE Yahoo_Data;--").is_err());
        assert!(normalize_ticker("../etc").is_err());
        assert!(normalize_ticker("A B").is_err());
    }

    #[test]
    fn rejects_overlong() {
        assert!(normalize_ticker(&"A".repeat(MAX_TICKER_LEN + 1)).is_err());
        assert!(normalize_ticker(&"A".repeat(MAX_TICKER_LEN)).is_ok());
    }
}
