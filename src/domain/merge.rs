//! Merge bookkeeping shared by store implementations.

use crate::domain::price_point::PricePoint;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of one `PriceStore::merge` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeResult {
    pub inserted: usize,
    pub updated: usize,
    /// Keys already present with identical values.
    pub unchanged: usize,
}

impl MergeResult {
    pub fn changed(&self) -> usize {
        self.inserted + self.updated
    }
}

impl fmt::Display for MergeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} updated, {} unchanged",
            self.inserted, self.updated, self.unchanged
        )
    }
}

/// Collapse a batch to one point per (ticker, date), later entries winning.
pub fn dedup_batch(points: &[PricePoint]) -> Vec<&PricePoint> {
    let mut by_key: BTreeMap<(&str, NaiveDate), &PricePoint> = BTreeMap::new();
    for point in points {
        by_key.insert((point.ticker.as_str(), point.date), point);
    }
    by_key.into_values().collect()
}
