//! Domain error types.

/// Failure classes reported by a quote source.
///
/// Sources never retry; the caller decides what to do with each class.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The remote reported the symbol as unknown. Retrying will not help.
    #[error("ticker {ticker} not found")]
    TickerNotFound { ticker: String },

    /// DNS, refused connection, timeout or any other transport failure.
    #[error("connection error: {reason}")]
    Connectivity { reason: String },

    #[error("unexpected HTTP status {status} for {ticker}")]
    UnexpectedStatus { ticker: String, status: u16 },
}

/// Top-level error type for stockdata.
#[derive(Debug, thiserror::Error)]
pub enum StockDataError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("no usable rows for {ticker} ({dropped} rows dropped)")]
    EmptyResult { ticker: String, dropped: usize },

    #[error("invalid ticker {input:?}: {reason}")]
    InvalidTicker { input: String, reason: String },

    #[error("invalid number of days {days}: must be between {min} and {max}")]
    InvalidWindow { days: u32, min: u32, max: u32 },

    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StockDataError {
    /// Stable short label for the error class, printed by the menu loop.
    pub fn kind(&self) -> &'static str {
        match self {
            StockDataError::Fetch(FetchError::TickerNotFound { .. }) => "ticker-not-found",
            StockDataError::Fetch(FetchError::Connectivity { .. }) => "connectivity",
            StockDataError::Fetch(FetchError::UnexpectedStatus { .. }) => "unexpected-status",
            StockDataError::EmptyResult { .. } => "empty-result",
            StockDataError::InvalidTicker { .. } | StockDataError::InvalidWindow { .. } => {
                "invalid-input"
            }
            StockDataError::MalformedResponse { .. } => "malformed-response",
            StockDataError::Database { .. } | StockDataError::DatabaseQuery { .. } => "database",
            StockDataError::ConfigParse { .. }
            | StockDataError::ConfigMissing { .. }
            | StockDataError::ConfigInvalid { .. } => "config",
            StockDataError::Io(_) => "io",
        }
    }
}

impl From<rusqlite::Error> for StockDataError {
    fn from(e: rusqlite::Error) -> Self {
        StockDataError::DatabaseQuery {
            reason: e.to_string(),
        }
    }
}

impl From<r2d2::Error> for StockDataError {
    fn from(e: r2d2::Error) -> Self {
        StockDataError::Database {
            reason: e.to_string(),
        }
    }
}

impl From<&StockDataError> for std::process::ExitCode {
    fn from(err: &StockDataError) -> Self {
        let code: u8 = match err {
            StockDataError::Io(_) => 1,
            StockDataError::ConfigParse { .. }
            | StockDataError::ConfigMissing { .. }
            | StockDataError::ConfigInvalid { .. }
            | StockDataError::InvalidTicker { .. }
            | StockDataError::InvalidWindow { .. } => 2,
            StockDataError::Database { .. } | StockDataError::DatabaseQuery { .. } => 3,
            StockDataError::Fetch(_) | StockDataError::MalformedResponse { .. } => 4,
            StockDataError::EmptyResult { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
