//! Concrete adapter implementations of the port traits.

pub mod file_config_adapter;
pub mod csv_market_adapter;
pub mod http_market_adapter;
pub mod memory_store_adapter;

#[cfg(feature = "sqlite")]
pub mod sqlite_store_adapter;

#[cfg(feature = "web")]
pub mod web;
