//! Portfolio ledger: cash, holdings, and the transaction log.
//!
//! One `Ledger` per account, constructed with its collaborators injected.
//! Every operation is a single atomic transition: a rejected trade leaves
//! the state untouched. Persistence and price failures are absorbed here
//! and never surface to trade callers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::error::PapertraderError;
use super::holding::Holding;
use super::mock;
use super::transaction::{TradeSide, Transaction};
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::store_port::LedgerStorePort;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;

/// The full persistable state of one account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerState {
    pub cash: f64,
    pub initial_capital: f64,
    pub holdings: HashMap<String, Holding>,
    pub transactions: Vec<Transaction>,
}

impl LedgerState {
    pub fn new(initial_capital: f64) -> Self {
        LedgerState {
            cash: initial_capital,
            initial_capital,
            holdings: HashMap::new(),
            transactions: Vec::new(),
        }
    }

    /// Sum of cost bases across open holdings.
    pub fn total_invested(&self) -> f64 {
        self.holdings.values().map(|h| h.total_cost_basis).sum()
    }
}

/// One holding priced for a valuation snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingView {
    pub quantity: f64,
    pub average_cost: f64,
    pub current_price: f64,
    pub current_value: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationSnapshot {
    pub cash: f64,
    pub holdings_value: f64,
    pub total_invested: f64,
    pub total_value: f64,
    pub initial_capital: f64,
    pub profit_loss: f64,
    pub profit_loss_pct: f64,
    pub holdings: BTreeMap<String, HoldingView>,
}

pub struct Ledger {
    account_id: String,
    state: LedgerState,
    market: Arc<dyn MarketDataPort + Send + Sync>,
    store: Arc<dyn LedgerStorePort + Send + Sync>,
}

impl Ledger {
    /// Load the persisted state for `account_id`, or start fresh with
    /// `initial_capital`. A load failure is logged and treated as absent.
    pub fn open(
        account_id: impl Into<String>,
        initial_capital: f64,
        market: Arc<dyn MarketDataPort + Send + Sync>,
        store: Arc<dyn LedgerStorePort + Send + Sync>,
    ) -> Self {
        let account_id = account_id.into();
        let state = match store.load(&account_id) {
            Ok(Some(state)) => {
                info!(account = %account_id, "loaded ledger from store");
                Some(state)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(account = %account_id, error = %e, "ledger load failed, starting fresh");
                None
            }
        };

        let mut ledger = Ledger {
            account_id,
            state: state.unwrap_or_else(|| LedgerState::new(initial_capital)),
            market,
            store,
        };
        if ledger.state.transactions.is_empty() && ledger.state.holdings.is_empty() {
            ledger.persist();
        }
        ledger
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Buy `quantity` shares of `symbol` at `price`.
    pub fn buy(
        &mut self,
        symbol: &str,
        quantity: f64,
        price: f64,
    ) -> Result<ValuationSnapshot, PapertraderError> {
        if quantity <= 0.0 {
            return Err(PapertraderError::InvalidQuantity { quantity });
        }

        let cost = quantity * price;
        if cost > self.state.cash {
            return Err(PapertraderError::InsufficientCash {
                required: cost,
                available: self.state.cash,
            });
        }

        self.state.cash -= cost;
        match self.state.holdings.get_mut(symbol) {
            Some(holding) => holding.add_lot(quantity, cost),
            None => {
                self.state
                    .holdings
                    .insert(symbol.to_string(), Holding::open(quantity, price));
            }
        }
        self.state
            .transactions
            .push(Transaction::new(TradeSide::Buy, symbol, quantity, price));

        self.persist();
        info!(account = %self.account_id, symbol, quantity, price, cost, "bought");
        Ok(self.valuation())
    }

    /// Sell `quantity` shares of `symbol` at `price`. Selling the whole
    /// position removes it; re-entering later starts a fresh average cost.
    pub fn sell(
        &mut self,
        symbol: &str,
        quantity: f64,
        price: f64,
    ) -> Result<ValuationSnapshot, PapertraderError> {
        if quantity <= 0.0 {
            return Err(PapertraderError::InvalidQuantity { quantity });
        }

        let holding = match self.state.holdings.get_mut(symbol) {
            Some(holding) => holding,
            None => {
                return Err(PapertraderError::NoPosition {
                    symbol: symbol.to_string(),
                });
            }
        };
        if quantity > holding.quantity {
            return Err(PapertraderError::InsufficientQuantity {
                symbol: symbol.to_string(),
                requested: quantity,
                held: holding.quantity,
            });
        }

        holding.quantity -= quantity;
        holding.total_cost_basis = holding.quantity * holding.average_cost;
        let position_closed = holding.quantity <= 0.0;
        if position_closed {
            self.state.holdings.remove(symbol);
        }

        let revenue = quantity * price;
        self.state.cash += revenue;

        self.state
            .transactions
            .push(Transaction::new(TradeSide::Sell, symbol, quantity, price));

        self.persist();
        info!(account = %self.account_id, symbol, quantity, price, revenue, "sold");
        Ok(self.valuation())
    }

    /// Buy at the market's current price, falling back to the deterministic
    /// reference price when the market port fails.
    pub fn buy_at_market(
        &mut self,
        symbol: &str,
        quantity: f64,
    ) -> Result<ValuationSnapshot, PapertraderError> {
        let price = self.resolve_price(symbol);
        self.buy(symbol, quantity, price)
    }

    /// Sell at the market's current price, with the same fallback as
    /// [`Ledger::buy_at_market`].
    pub fn sell_at_market(
        &mut self,
        symbol: &str,
        quantity: f64,
    ) -> Result<ValuationSnapshot, PapertraderError> {
        let price = self.resolve_price(symbol);
        self.sell(symbol, quantity, price)
    }

    /// Price every open holding and summarize the account. Never fails: a
    /// per-symbol price failure falls back to that holding's average cost,
    /// so its unrealized P/L reads as zero.
    pub fn valuation(&self) -> ValuationSnapshot {
        let mut holdings_value = 0.0;
        let mut views = BTreeMap::new();

        for (symbol, holding) in &self.state.holdings {
            let price = match self.market.current_price(symbol) {
                Ok(price) => price,
                Err(e) => {
                    warn!(symbol, error = %e, "price unavailable, valuing at average cost");
                    holding.average_cost
                }
            };
            let current_value = holding.market_value(price);
            holdings_value += current_value;

            let unrealized_pnl = holding.unrealized_pnl(price);
            views.insert(
                symbol.clone(),
                HoldingView {
                    quantity: holding.quantity,
                    average_cost: holding.average_cost,
                    current_price: price,
                    current_value,
                    unrealized_pnl,
                    unrealized_pnl_pct: if holding.total_cost_basis > 0.0 {
                        unrealized_pnl / holding.total_cost_basis * 100.0
                    } else {
                        0.0
                    },
                },
            );
        }

        let total_value = self.state.cash + holdings_value;
        let profit_loss = total_value - self.state.initial_capital;

        ValuationSnapshot {
            cash: self.state.cash,
            holdings_value,
            total_invested: self.state.total_invested(),
            total_value,
            initial_capital: self.state.initial_capital,
            profit_loss,
            profit_loss_pct: if self.state.initial_capital > 0.0 {
                profit_loss / self.state.initial_capital * 100.0
            } else {
                0.0
            },
            holdings: views,
        }
    }

    /// Replace the whole state with an empty ledger holding `initial_capital`.
    pub fn reset(&mut self, initial_capital: f64) -> ValuationSnapshot {
        self.state = LedgerState::new(initial_capital);
        self.persist();
        info!(account = %self.account_id, initial_capital, "ledger reset");
        self.valuation()
    }

    /// Transaction history, newest first, optionally capped.
    pub fn transactions(&self, limit: Option<usize>) -> Vec<Transaction> {
        let iter = self.state.transactions.iter().rev().cloned();
        match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        }
    }

    fn resolve_price(&self, symbol: &str) -> f64 {
        match self.market.current_price(symbol) {
            Ok(price) => price,
            Err(e) => {
                warn!(symbol, error = %e, "price unavailable, using reference price");
                mock::reference_price(symbol)
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.account_id, &self.state) {
            warn!(account = %self.account_id, error = %e, "ledger save failed, state kept in memory");
        }
    }
}
