//! Core domain types and logic.

pub mod price_point;
pub mod ticker;
pub mod fetch_window;
pub mod normalizer;
pub mod merge;
pub mod pipeline;
pub mod analysis;
pub mod settings;
pub mod error;
