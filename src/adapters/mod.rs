//! Concrete adapter implementations for ports.

pub mod yahoo_adapter;
pub mod csv_source_adapter;
pub mod sqlite_store;
pub mod file_config_adapter;
pub mod svg_chart;
