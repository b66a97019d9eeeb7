//! Contains traits and implementations for the stores the rule engine reads and writes.
//!
//! The engine never touches a store directly. It asks a [Ledger] for an atomic
//! scope and works through the [LedgerScope] it is given: every read and write
//! made inside one call to [Ledger::atomically] is committed together, or not
//! at all.

mod batch;
mod memory;
mod rule;
pub mod sqlite;
mod transaction;

pub use batch::BatchStore;
pub use memory::{FailurePoint, MemoryLedger};
pub use rule::RuleStore;
pub use sqlite::{SQLiteLedger, SQLiteStore};
pub use transaction::{TransactionQuery, TransactionStore};

use crate::Error;

/// All the stores, as seen from inside one atomic scope.
pub trait LedgerScope: RuleStore + TransactionStore + BatchStore {}

impl<T: RuleStore + TransactionStore + BatchStore> LedgerScope for T {}

/// Gives atomic access to the rule, transaction and batch stores.
pub trait Ledger {
    /// Run `operation` inside one atomic scope.
    ///
    /// Everything `operation` writes is committed if it returns `Ok`, and
    /// rolled back if it returns `Err`. Reads inside the scope see a
    /// consistent snapshot, and no other scope can write in between a read
    /// and a write made in the same scope.
    ///
    /// # Errors
    ///
    /// Returns the error from `operation`, or an error if the scope could not
    /// be opened or committed. In every error case nothing is written.
    fn atomically<T, F>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce(&mut dyn LedgerScope) -> Result<T, Error>;
}
