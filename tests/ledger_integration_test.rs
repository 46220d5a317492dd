//! Ledger integration tests.
//!
//! Cover the full trade flow against the memory and SQLite stores, the
//! persistence round-trip through `Ledger::open`, and the cash-conservation
//! property under arbitrary valid buy sequences.

mod common;

use common::*;
use papertrader::adapters::memory_store_adapter::MemoryStoreAdapter;
use papertrader::domain::error::PapertraderError;
use papertrader::domain::ledger::Ledger;
use papertrader::domain::transaction::TradeSide;
use papertrader::ports::market_data_port::MarketDataPort;
use papertrader::ports::store_port::LedgerStorePort;
use proptest::prelude::*;
use std::sync::Arc;

fn quoted_market() -> Arc<dyn MarketDataPort + Send + Sync> {
    Arc::new(
        MockMarket::new()
            .with_price("RELIANCE", 650.0)
            .with_price("TCS", 800.0)
            .with_price("INFY", 1500.0),
    )
}

#[test]
fn trade_flow_persists_across_reopen() {
    let market = quoted_market();
    let store: Arc<dyn LedgerStorePort + Send + Sync> = Arc::new(MemoryStoreAdapter::new());

    {
        let mut ledger = Ledger::open(
            "default-user",
            10_000.0,
            Arc::clone(&market),
            Arc::clone(&store),
        );
        ledger.buy("RELIANCE", 5.0, 650.0).unwrap();
        ledger.buy("RELIANCE", 1.0, 750.0).unwrap();
        ledger.buy("TCS", 2.0, 800.0).unwrap();
        ledger.sell("TCS", 2.0, 850.0).unwrap();
    }

    let reopened = Ledger::open("default-user", 999.0, market, store);
    let state = reopened.state();

    // 10000 - 3250 - 750 - 1600 + 1700
    assert!((state.cash - 6_100.0).abs() < 1e-9);
    assert!((state.initial_capital - 10_000.0).abs() < f64::EPSILON);
    assert_eq!(state.holdings.len(), 1);
    let holding = &state.holdings["RELIANCE"];
    assert!((holding.quantity - 6.0).abs() < f64::EPSILON);
    assert!((holding.average_cost - 4_000.0 / 6.0).abs() < 1e-9);
    assert_eq!(state.transactions.len(), 4);
    assert_eq!(state.transactions[3].side, TradeSide::Sell);

    let history = reopened.transactions(Some(2));
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].side, TradeSide::Sell);
    assert_eq!(history[0].symbol, "TCS");
}

#[test]
fn accounts_are_isolated_in_one_store() {
    let market = quoted_market();
    let store: Arc<dyn LedgerStorePort + Send + Sync> = Arc::new(MemoryStoreAdapter::new());

    let mut alice = Ledger::open("alice", 10_000.0, Arc::clone(&market), Arc::clone(&store));
    let mut bob = Ledger::open("bob", 5_000.0, Arc::clone(&market), Arc::clone(&store));

    alice.buy("RELIANCE", 2.0, 650.0).unwrap();
    bob.buy("TCS", 1.0, 800.0).unwrap();

    let alice2 = Ledger::open("alice", 0.0, Arc::clone(&market), Arc::clone(&store));
    let bob2 = Ledger::open("bob", 0.0, market, store);

    assert!(alice2.state().holdings.contains_key("RELIANCE"));
    assert!(!alice2.state().holdings.contains_key("TCS"));
    assert!(bob2.state().holdings.contains_key("TCS"));
    assert!((bob2.state().cash - 4_200.0).abs() < 1e-9);
}

#[test]
fn valuation_marks_holdings_to_market() {
    let market = quoted_market();
    let store: Arc<dyn LedgerStorePort + Send + Sync> = Arc::new(MemoryStoreAdapter::new());
    let mut ledger = Ledger::open("default-user", 10_000.0, market, store);

    ledger.buy("RELIANCE", 4.0, 600.0).unwrap();
    let snapshot = ledger.valuation();

    // Quoted at 650 against a 600 basis.
    assert!((snapshot.holdings_value - 2_600.0).abs() < 1e-9);
    assert!((snapshot.total_invested - 2_400.0).abs() < 1e-9);
    assert!((snapshot.total_value - (7_600.0 + 2_600.0)).abs() < 1e-9);
    assert!((snapshot.profit_loss - 200.0).abs() < 1e-9);
    let view = &snapshot.holdings["RELIANCE"];
    assert!((view.unrealized_pnl - 200.0).abs() < 1e-9);
}

#[test]
fn failed_trades_leave_no_trace_in_the_store() {
    let market = quoted_market();
    let store: Arc<dyn LedgerStorePort + Send + Sync> = Arc::new(MemoryStoreAdapter::new());
    let mut ledger = Ledger::open(
        "default-user",
        1_000.0,
        Arc::clone(&market),
        Arc::clone(&store),
    );

    assert!(matches!(
        ledger.buy("RELIANCE", 5.0, 650.0),
        Err(PapertraderError::InsufficientCash { .. })
    ));
    assert!(matches!(
        ledger.sell("RELIANCE", 1.0, 650.0),
        Err(PapertraderError::NoPosition { .. })
    ));

    let persisted = store.load("default-user").unwrap().unwrap();
    assert!((persisted.cash - 1_000.0).abs() < f64::EPSILON);
    assert!(persisted.holdings.is_empty());
    assert!(persisted.transactions.is_empty());
}

#[cfg(feature = "sqlite")]
mod sqlite_round_trip {
    use super::*;
    use papertrader::adapters::sqlite_store_adapter::SqliteStoreAdapter;

    #[test]
    fn trade_flow_persists_through_sqlite() {
        let market = quoted_market();
        let store: Arc<dyn LedgerStorePort + Send + Sync> =
            Arc::new(SqliteStoreAdapter::in_memory().unwrap());

        {
            let mut ledger = Ledger::open(
                "default-user",
                10_000.0,
                Arc::clone(&market),
                Arc::clone(&store),
            );
            ledger.buy("RELIANCE", 5.0, 650.0).unwrap();
            ledger.sell("RELIANCE", 2.0, 700.0).unwrap();
        }

        let reopened = Ledger::open("default-user", 0.0, market, store);
        let state = reopened.state();

        assert!((state.cash - (10_000.0 - 3_250.0 + 1_400.0)).abs() < 1e-9);
        let holding = &state.holdings["RELIANCE"];
        assert!((holding.quantity - 3.0).abs() < f64::EPSILON);
        assert!((holding.average_cost - 650.0).abs() < f64::EPSILON);
        assert_eq!(state.transactions.len(), 2);
        assert_eq!(state.transactions[0].side, TradeSide::Buy);
        assert_eq!(state.transactions[1].side, TradeSide::Sell);
    }

    #[test]
    fn reset_clears_persisted_state() {
        let market = quoted_market();
        let store: Arc<dyn LedgerStorePort + Send + Sync> =
            Arc::new(SqliteStoreAdapter::in_memory().unwrap());

        let mut ledger = Ledger::open(
            "default-user",
            10_000.0,
            Arc::clone(&market),
            Arc::clone(&store),
        );
        ledger.buy("TCS", 2.0, 800.0).unwrap();
        ledger.reset(5_000.0);

        let persisted = store.load("default-user").unwrap().unwrap();
        assert!((persisted.cash - 5_000.0).abs() < f64::EPSILON);
        assert!(persisted.holdings.is_empty());
        assert!(persisted.transactions.is_empty());
    }
}

proptest! {
    /// Whole-number buys on a fresh ledger conserve cash exactly:
    /// cash + sum of executed costs == initial capital.
    #[test]
    fn buys_conserve_cash_exactly(
        trades in prop::collection::vec((1u32..=10, 1u32..=1_000), 1..40)
    ) {
        let market = quoted_market();
        let store: Arc<dyn LedgerStorePort + Send + Sync> = Arc::new(MemoryStoreAdapter::new());
        let capital = 1_000_000.0;
        let mut ledger = Ledger::open("prop", capital, market, store);

        let mut spent = 0.0_f64;
        for (quantity, price) in trades {
            let quantity = quantity as f64;
            let price = price as f64;
            match ledger.buy("RELIANCE", quantity, price) {
                Ok(_) => spent += quantity * price,
                Err(PapertraderError::InsufficientCash { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        prop_assert_eq!(ledger.state().cash + spent, capital);
    }

    /// Average cost always equals total cost basis over quantity.
    #[test]
    fn average_cost_matches_weighted_mean(
        lots in prop::collection::vec((1u32..=20, 50u32..=2_000), 1..10)
    ) {
        let market = quoted_market();
        let store: Arc<dyn LedgerStorePort + Send + Sync> = Arc::new(MemoryStoreAdapter::new());
        let mut ledger = Ledger::open("prop", 10_000_000.0, market, store);

        let mut total_quantity = 0.0_f64;
        let mut total_cost = 0.0_f64;
        for (quantity, price) in lots {
            let quantity = quantity as f64;
            let price = price as f64;
            ledger.buy("TCS", quantity, price).unwrap();
            total_quantity += quantity;
            total_cost += quantity * price;
        }

        let holding = &ledger.state().holdings["TCS"];
        let expected = total_cost / total_quantity;
        prop_assert!((holding.average_cost - expected).abs() < 1e-9);
        prop_assert!((holding.total_cost_basis - total_cost).abs() < 1e-6);
    }
}
