//! In-memory ledger store.
//!
//! Keeps full ledger states in a mutex-guarded map. Used by tests and as
//! the store when running without the `sqlite` feature.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::error::PapertraderError;
use crate::domain::ledger::LedgerState;
use crate::ports::store_port::LedgerStorePort;

#[derive(Default)]
pub struct MemoryStoreAdapter {
    states: Mutex<HashMap<String, LedgerState>>,
}

impl MemoryStoreAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStorePort for MemoryStoreAdapter {
    fn load(&self, account_id: &str) -> Result<Option<LedgerState>, PapertraderError> {
        let states = self.states.lock().map_err(|_| {
            PapertraderError::PersistenceUnavailable {
                reason: "store lock poisoned".into(),
            }
        })?;
        Ok(states.get(account_id).cloned())
    }

    fn save(&self, account_id: &str, state: &LedgerState) -> Result<(), PapertraderError> {
        let mut states = self.states.lock().map_err(|_| {
            PapertraderError::PersistenceUnavailable {
                reason: "store lock poisoned".into(),
            }
        })?;
        states.insert(account_id.to_string(), state.clone());
        Ok(())
    }
}
