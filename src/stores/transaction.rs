//! Defines the transaction store trait.

use crate::{
    Error,
    category::CategoryName,
    database_id::TransactionId,
    transaction::{DateRange, Transaction, TransactionBuilder},
};

/// Handles the creation, retrieval and recategorization of transactions.
pub trait TransactionStore {
    /// Create a new transaction in the store.
    fn create_transaction(&mut self, builder: TransactionBuilder) -> Result<Transaction, Error>;

    /// Retrieve a transaction, or [Error::TransactionNotFound] if `id` does
    /// not refer to a transaction.
    fn get_transaction(&self, id: TransactionId) -> Result<Transaction, Error>;

    /// Retrieve transactions from the store in the way defined by `query`.
    ///
    /// Transactions are returned ordered by date, then by ID.
    fn query_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, Error>;

    /// Replace the category of a transaction and return the category it replaced.
    ///
    /// The returned value is read together with the write, so it is the exact
    /// category the transaction held immediately before this call.
    ///
    /// Returns [Error::TransactionNotFound] if `id` does not refer to a
    /// transaction.
    fn set_category(
        &mut self,
        id: TransactionId,
        category: Option<&CategoryName>,
    ) -> Result<Option<CategoryName>, Error>;
}

/// Defines how transactions should be fetched from [TransactionStore::query_transactions].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    /// Include transactions within `date_range` (inclusive). `None` includes all dates.
    pub date_range: Option<DateRange>,
}
