//! Port traits between the domain and its adapters.

pub mod quote_port;
pub mod store_port;
pub mod config_port;
