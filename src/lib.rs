//! papertrader: simulated equity trading account with strategy backtesting.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. The [`autotrade`] module drives the
//! ledger from live signals on a background cycle.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod autotrade;
pub mod cli;
