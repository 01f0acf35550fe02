//! Quote source port trait.

use crate::domain::error::FetchError;
use crate::domain::fetch_window::FetchWindow;
use crate::domain::normalizer::RawTable;

/// A source of historical daily quotes.
///
/// Implementations return the table unparsed and never retry.
pub trait QuotePort {
    fn fetch(&self, window: &FetchWindow) -> Result<RawTable, FetchError>;
}
