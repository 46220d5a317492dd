//! Ledger persistence port trait.

use crate::domain::error::PapertraderError;
use crate::domain::ledger::LedgerState;

pub trait LedgerStorePort {
    /// Full persisted state for an account, or `None` if never saved.
    fn load(&self, account_id: &str) -> Result<Option<LedgerState>, PapertraderError>;

    /// Replace the persisted state for an account.
    fn save(&self, account_id: &str, state: &LedgerState) -> Result<(), PapertraderError>;
}
