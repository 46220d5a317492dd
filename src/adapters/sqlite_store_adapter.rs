//! SQLite ledger store adapter.

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::collections::HashMap;

use crate::domain::error::PapertraderError;
use crate::domain::holding::Holding;
use crate::domain::ledger::LedgerState;
use crate::domain::transaction::{TradeSide, Transaction};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::LedgerStorePort;

#[derive(Debug)]
pub struct SqliteStoreAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStoreAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PapertraderError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| PapertraderError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;
        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| PapertraderError::Database {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, PapertraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| PapertraderError::Database {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn initialize_schema(&self) -> Result<(), PapertraderError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| PapertraderError::Database {
                reason: e.to_string(),
            })?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                account_id TEXT PRIMARY KEY,
                cash REAL NOT NULL,
                initial_capital REAL NOT NULL
            );
            CREATE TABLE IF NOT EXISTS holdings (
                account_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                quantity REAL NOT NULL,
                average_cost REAL NOT NULL,
                total_cost_basis REAL NOT NULL,
                PRIMARY KEY (account_id, symbol)
            );
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id TEXT NOT NULL,
                side TEXT NOT NULL,
                symbol TEXT NOT NULL,
                quantity REAL NOT NULL,
                price REAL NOT NULL,
                amount REAL NOT NULL,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_holdings_account ON holdings(account_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);",
        )
        .map_err(|e: rusqlite::Error| PapertraderError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }
}

impl LedgerStorePort for SqliteStoreAdapter {
    fn load(&self, account_id: &str) -> Result<Option<LedgerState>, PapertraderError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| PapertraderError::Database {
                reason: e.to_string(),
            })?;

        let account = conn
            .query_row(
                "SELECT cash, initial_capital FROM accounts WHERE account_id = ?1",
                params![account_id],
                |row| Ok((row.get::<_, f64>(0)?, row.get::<_, f64>(1)?)),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(PapertraderError::DatabaseQuery {
                    reason: other.to_string(),
                }),
            })?;

        let (cash, initial_capital) = match account {
            Some(pair) => pair,
            None => return Ok(None),
        };

        let mut holdings = HashMap::new();
        {
            let mut stmt = conn
                .prepare(
                    "SELECT symbol, quantity, average_cost, total_cost_basis
                     FROM holdings WHERE account_id = ?1",
                )
                .map_err(|e| PapertraderError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
            let rows = stmt
                .query_map(params![account_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        Holding {
                            quantity: row.get(1)?,
                            average_cost: row.get(2)?,
                            total_cost_basis: row.get(3)?,
                        },
                    ))
                })
                .map_err(|e| PapertraderError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
            for row in rows {
                let (symbol, holding) = row.map_err(|e| PapertraderError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
                holdings.insert(symbol, holding);
            }
        }

        let mut transactions = Vec::new();
        {
            let mut stmt = conn
                .prepare(
                    "SELECT side, symbol, quantity, price, amount, timestamp
                     FROM transactions WHERE account_id = ?1 ORDER BY id ASC",
                )
                .map_err(|e| PapertraderError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
            let rows = stmt
                .query_map(params![account_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })
                .map_err(|e| PapertraderError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
            for row in rows {
                let (side, symbol, quantity, price, amount, timestamp) =
                    row.map_err(|e| PapertraderError::DatabaseQuery {
                        reason: e.to_string(),
                    })?;
                let side =
                    TradeSide::parse(&side).ok_or_else(|| PapertraderError::DatabaseQuery {
                        reason: format!("unknown trade side: {side}"),
                    })?;
                let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                    .map_err(|e| PapertraderError::DatabaseQuery {
                        reason: format!("invalid timestamp: {e}"),
                    })?
                    .with_timezone(&Utc);
                transactions.push(Transaction {
                    side,
                    symbol,
                    quantity,
                    price,
                    amount,
                    timestamp,
                });
            }
        }

        Ok(Some(LedgerState {
            cash,
            initial_capital,
            holdings,
            transactions,
        }))
    }

    fn save(&self, account_id: &str, state: &LedgerState) -> Result<(), PapertraderError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| PapertraderError::Database {
                reason: e.to_string(),
            })?;

        let tx = conn
            .transaction()
            .map_err(|e: rusqlite::Error| PapertraderError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        tx.execute(
            "INSERT OR REPLACE INTO accounts (account_id, cash, initial_capital)
             VALUES (?1, ?2, ?3)",
            params![account_id, state.cash, state.initial_capital],
        )
        .map_err(|e| PapertraderError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        tx.execute(
            "DELETE FROM holdings WHERE account_id = ?1",
            params![account_id],
        )
        .map_err(|e| PapertraderError::DatabaseQuery {
            reason: e.to_string(),
        })?;
        for (symbol, holding) in &state.holdings {
            tx.execute(
                "INSERT INTO holdings (account_id, symbol, quantity, average_cost, total_cost_basis)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    account_id,
                    symbol,
                    holding.quantity,
                    holding.average_cost,
                    holding.total_cost_basis
                ],
            )
            .map_err(|e| PapertraderError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        }

        tx.execute(
            "DELETE FROM transactions WHERE account_id = ?1",
            params![account_id],
        )
        .map_err(|e| PapertraderError::DatabaseQuery {
            reason: e.to_string(),
        })?;
        for transaction in &state.transactions {
            tx.execute(
                "INSERT INTO transactions (account_id, side, symbol, quantity, price, amount, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    account_id,
                    transaction.side.as_str(),
                    transaction.symbol,
                    transaction.quantity,
                    transaction.price,
                    transaction.amount,
                    transaction.timestamp.to_rfc3339()
                ],
            )
            .map_err(|e| PapertraderError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| PapertraderError::DatabaseQuery {
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> LedgerState {
        let mut state = LedgerState::new(10_000.0);
        state.cash = 6_750.0;
        state
            .holdings
            .insert("RELIANCE".to_string(), Holding::open(5.0, 650.0));
        state
            .transactions
            .push(Transaction::new(TradeSide::Buy, "RELIANCE", 5.0, 650.0));
        state
    }

    #[test]
    fn load_absent_account_is_none() {
        let store = SqliteStoreAdapter::in_memory().unwrap();
        assert!(store.load("missing").unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = SqliteStoreAdapter::in_memory().unwrap();
        let state = sample_state();
        store.save("default-user", &state).unwrap();

        let loaded = store.load("default-user").unwrap().unwrap();
        assert!((loaded.cash - 6_750.0).abs() < f64::EPSILON);
        assert!((loaded.initial_capital - 10_000.0).abs() < f64::EPSILON);
        assert_eq!(loaded.holdings.len(), 1);
        let holding = &loaded.holdings["RELIANCE"];
        assert!((holding.quantity - 5.0).abs() < f64::EPSILON);
        assert!((holding.average_cost - 650.0).abs() < f64::EPSILON);
        assert_eq!(loaded.transactions.len(), 1);
        assert_eq!(loaded.transactions[0].side, TradeSide::Buy);
    }

    #[test]
    fn save_replaces_previous_state() {
        let store = SqliteStoreAdapter::in_memory().unwrap();
        store.save("a", &sample_state()).unwrap();

        let empty = LedgerState::new(2_000.0);
        store.save("a", &empty).unwrap();

        let loaded = store.load("a").unwrap().unwrap();
        assert!((loaded.cash - 2_000.0).abs() < f64::EPSILON);
        assert!(loaded.holdings.is_empty());
        assert!(loaded.transactions.is_empty());
    }

    #[test]
    fn transaction_order_is_preserved() {
        let store = SqliteStoreAdapter::in_memory().unwrap();
        let mut state = LedgerState::new(10_000.0);
        state
            .transactions
            .push(Transaction::new(TradeSide::Buy, "TCS", 2.0, 800.0));
        state
            .transactions
            .push(Transaction::new(TradeSide::Sell, "TCS", 1.0, 850.0));
        state
            .transactions
            .push(Transaction::new(TradeSide::Buy, "INFY", 3.0, 1500.0));
        store.save("a", &state).unwrap();

        let loaded = store.load("a").unwrap().unwrap();
        assert_eq!(loaded.transactions.len(), 3);
        assert_eq!(loaded.transactions[0].symbol, "TCS");
        assert_eq!(loaded.transactions[1].side, TradeSide::Sell);
        assert_eq!(loaded.transactions[2].symbol, "INFY");
    }

    #[test]
    fn from_config_requires_path() {
        struct EmptyConfig;
        impl ConfigPort for EmptyConfig {
            fn get_string(&self, _: &str, _: &str) -> Option<String> {
                None
            }
            fn get_int(&self, _: &str, _: &str, default: i64) -> i64 {
                default
            }
            fn get_double(&self, _: &str, _: &str, default: f64) -> f64 {
                default
            }
            fn get_bool(&self, _: &str, _: &str, default: bool) -> bool {
                default
            }
        }

        let err = SqliteStoreAdapter::from_config(&EmptyConfig).unwrap_err();
        assert!(matches!(err, PapertraderError::ConfigMissing { .. }));
    }

    #[test]
    fn from_config_creates_file_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("ledger.db");
        let content = format!("[sqlite]\npath = {}\n", db_path.display());
        let config =
            crate::adapters::file_config_adapter::FileConfigAdapter::from_string(&content)
                .unwrap();

        let store = SqliteStoreAdapter::from_config(&config).unwrap();
        store.save("a", &sample_state()).unwrap();
        assert!(store.load("a").unwrap().is_some());
        assert!(db_path.exists());
    }
}
