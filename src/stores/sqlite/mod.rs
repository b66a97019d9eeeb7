//! Implements the stores on top of SQLite.
//!
//! [SQLiteStore] implements the store traits over a borrowed connection, and
//! [SQLiteLedger] hands out a [SQLiteStore] over a SQLite transaction for each
//! atomic scope.

mod batch;
mod rule;
mod transaction;

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, TransactionBehavior};

use crate::{
    Error,
    db::initialize,
    stores::{Ledger, LedgerScope},
};

/// The rule, transaction and batch stores over a SQLite connection.
///
/// When `connection` is a SQLite transaction, every write made through the
/// store is committed or rolled back with that transaction.
#[derive(Debug)]
pub struct SQLiteStore<'a> {
    connection: &'a Connection,
}

impl<'a> SQLiteStore<'a> {
    /// Create a new store for the SQLite `connection`.
    ///
    /// The tables must have been created with [crate::initialize_db].
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }
}

/// A [Ledger] backed by a shared SQLite connection.
///
/// Each atomic scope is a SQLite transaction opened with
/// [TransactionBehavior::Immediate], so the write lock is held from the first
/// read until the commit.
#[derive(Debug, Clone)]
pub struct SQLiteLedger {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteLedger {
    /// Create a ledger for the shared SQLite `connection`.
    ///
    /// The tables must have been created with [crate::initialize_db].
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// Create the tables in `connection` if needed and wrap it in a ledger.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn open(connection: Connection) -> Result<Self, Error> {
        initialize(&connection)?;

        Ok(Self::new(Arc::new(Mutex::new(connection))))
    }
}

impl Ledger for SQLiteLedger {
    fn atomically<T, F>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce(&mut dyn LedgerScope) -> Result<T, Error>,
    {
        let mut connection = self
            .connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let result = operation(&mut SQLiteStore::new(&transaction));

        match result {
            Ok(value) => {
                transaction.commit()?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = transaction.rollback() {
                    tracing::error!("could not roll back after \"{error}\": {rollback_error}");
                }

                Err(error)
            }
        }
    }
}
