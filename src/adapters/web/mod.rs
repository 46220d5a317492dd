//! Web server adapter (feature `web`).
//!
//! Exposes the core operations as a JSON API. The handlers make no trading
//! decisions themselves; they parse input, call the domain, and map errors
//! to HTTP statuses.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;

use crate::domain::backtest::BacktestConfig;
use crate::domain::ledger::Ledger;
use crate::domain::signal::SignalConfig;
use crate::ports::market_data_port::MarketDataPort;

pub struct AppState {
    pub ledger: Arc<Mutex<Ledger>>,
    pub market: Arc<dyn MarketDataPort + Send + Sync>,
    pub signal_config: SignalConfig,
    pub backtest_config: BacktestConfig,
    /// History window handed to the signal aggregator.
    pub history_days: usize,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/portfolio", get(handlers::portfolio))
        .route("/api/portfolio/reset", post(handlers::reset))
        .route("/api/trade/buy", post(handlers::buy))
        .route("/api/trade/sell", post(handlers::sell))
        .route("/api/transactions", get(handlers::transactions))
        .route("/api/backtest", post(handlers::run_backtest))
        .route(
            "/api/backtest/compare/{symbol}",
            get(handlers::compare_strategies),
        )
        .route("/api/signals/bulk", post(handlers::bulk_signals))
        .route("/api/signals/{symbol}", get(handlers::signal_for_symbol))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
