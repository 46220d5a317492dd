//! HTTP request handlers for the web adapter.
//!
//! The domain is synchronous and the market port may block on the network,
//! so every handler that touches it runs the core call on the blocking pool.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::backtest::{self, BacktestResult, StrategyKind};
use crate::domain::ledger::{DEFAULT_INITIAL_CAPITAL, ValuationSnapshot};
use crate::domain::signal::{self, MarketSentiment, Signal};
use crate::domain::transaction::Transaction;

use super::{AppState, WebError};

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub quantity: f64,
    /// Explicit limit price; omitted means trade at the market price.
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub initial_capital: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BacktestRequest {
    pub strategy: String,
    pub symbol: String,
    pub initial_capital: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub initial_capital: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkSignalsRequest {
    pub symbols: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkSignalsResponse {
    pub signals: Vec<Signal>,
    pub sentiment: MarketSentiment,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub total: usize,
    pub transactions: Vec<Transaction>,
}

async fn run_blocking<T, F>(task: F) -> Result<T, WebError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, WebError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| WebError::internal(e.to_string()))?
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn portfolio(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ValuationSnapshot>, WebError> {
    let ledger = Arc::clone(&state.ledger);
    let snapshot = run_blocking(move || {
        let ledger = ledger.lock().map_err(|_| WebError::internal("ledger lock poisoned"))?;
        Ok(ledger.valuation())
    })
    .await?;
    Ok(Json(snapshot))
}

pub async fn buy(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TradeRequest>,
) -> Result<Json<ValuationSnapshot>, WebError> {
    let ledger = Arc::clone(&state.ledger);
    let snapshot = run_blocking(move || {
        let mut ledger = ledger.lock().map_err(|_| WebError::internal("ledger lock poisoned"))?;
        let result = match request.price {
            Some(price) => ledger.buy(&request.symbol, request.quantity, price),
            None => ledger.buy_at_market(&request.symbol, request.quantity),
        };
        result.map_err(WebError::from)
    })
    .await?;
    Ok(Json(snapshot))
}

pub async fn sell(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TradeRequest>,
) -> Result<Json<ValuationSnapshot>, WebError> {
    let ledger = Arc::clone(&state.ledger);
    let snapshot = run_blocking(move || {
        let mut ledger = ledger.lock().map_err(|_| WebError::internal("ledger lock poisoned"))?;
        let result = match request.price {
            Some(price) => ledger.sell(&request.symbol, request.quantity, price),
            None => ledger.sell_at_market(&request.symbol, request.quantity),
        };
        result.map_err(WebError::from)
    })
    .await?;
    Ok(Json(snapshot))
}

pub async fn reset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<ValuationSnapshot>, WebError> {
    let ledger = Arc::clone(&state.ledger);
    let capital = request.initial_capital.unwrap_or(DEFAULT_INITIAL_CAPITAL);
    let snapshot = run_blocking(move || {
        let mut ledger = ledger.lock().map_err(|_| WebError::internal("ledger lock poisoned"))?;
        Ok(ledger.reset(capital))
    })
    .await?;
    Ok(Json(snapshot))
}

pub async fn transactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>, WebError> {
    let ledger = state
        .ledger
        .lock()
        .map_err(|_| WebError::internal("ledger lock poisoned"))?;
    let transactions = ledger.transactions(query.limit);
    Ok(Json(TransactionsResponse {
        total: transactions.len(),
        transactions,
    }))
}

pub async fn run_backtest(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BacktestRequest>,
) -> Result<Json<BacktestResult>, WebError> {
    let strategy = StrategyKind::parse(&request.strategy).map_err(WebError::from)?;
    let market = Arc::clone(&state.market);
    let mut config = state.backtest_config.clone();
    if let Some(capital) = request.initial_capital {
        config.initial_capital = capital;
    }
    let history_days = state.history_days;

    let result = run_blocking(move || {
        let series = market.historical_series(&request.symbol, history_days).ok();
        Ok(backtest::run(
            strategy,
            &request.symbol,
            series.as_ref(),
            &config,
        ))
    })
    .await?;
    Ok(Json(result))
}

pub async fn compare_strategies(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<Vec<BacktestResult>>, WebError> {
    let market = Arc::clone(&state.market);
    let mut config = state.backtest_config.clone();
    if let Some(capital) = query.initial_capital {
        config.initial_capital = capital;
    }
    let history_days = state.history_days;

    let results = run_blocking(move || {
        let series = market.historical_series(&symbol, history_days).ok();
        Ok(backtest::compare(&symbol, series.as_ref(), &config))
    })
    .await?;
    Ok(Json(results))
}

pub async fn signal_for_symbol(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<Signal>, WebError> {
    let market = Arc::clone(&state.market);
    let config = state.signal_config.clone();
    let history_days = state.history_days;

    let signal = run_blocking(move || {
        let signals =
            signal::evaluate_symbols(market.as_ref(), &[symbol.clone()], history_days, &config);
        signals
            .into_iter()
            .next()
            .ok_or_else(|| WebError::internal(format!("no signal produced for {symbol}")))
    })
    .await?;
    Ok(Json(signal))
}

pub async fn bulk_signals(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkSignalsRequest>,
) -> Result<Json<BulkSignalsResponse>, WebError> {
    let market = Arc::clone(&state.market);
    let config = state.signal_config.clone();
    let history_days = state.history_days;

    let signals = run_blocking(move || {
        Ok(signal::evaluate_symbols(
            market.as_ref(),
            &request.symbols,
            history_days,
            &config,
        ))
    })
    .await?;
    let sentiment = signal::market_sentiment(&signals);
    Ok(Json(BulkSignalsResponse { signals, sentiment }))
}
