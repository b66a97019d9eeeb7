//! Defines the core data model for transactions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{category::CategoryName, database_id::TransactionId};

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// The rule engine only ever changes `category`, every other field is
/// read-only descriptive data used for matching.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// When the transaction happened.
    pub date: Date,
    /// The amount of money spent or earned in this transaction.
    ///
    /// Positive values are income, negative values are expenses.
    pub amount: Decimal,
    /// Who the money was paid to or received from, if known.
    pub merchant: Option<String>,
    /// Free text from the bank statement, if any.
    pub description: Option<String>,
    /// The account the transaction belongs to, if known.
    pub account: Option<String>,
    /// The category currently assigned to the transaction.
    pub category: Option<CategoryName>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: Decimal, date: Date) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            date,
            merchant: None,
            description: None,
            account: None,
            category: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// Stores turn a builder into a [Transaction] by assigning it an ID.
///
/// # Examples
///
/// ```ignore
/// use rust_decimal::Decimal;
/// use time::macros::date;
///
/// let builder = Transaction::build(Decimal::new(-450, 2), date!(2025 - 01 - 15))
///     .merchant("BLUE BOTTLE COFFEE")
///     .account("Everyday");
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The monetary amount of the transaction.
    pub amount: Decimal,
    /// The date when the transaction occurred.
    pub date: Date,
    /// Who the money was paid to or received from.
    pub merchant: Option<String>,
    /// Free text from the bank statement.
    pub description: Option<String>,
    /// The account the transaction belongs to.
    pub account: Option<String>,
    /// The category to start the transaction with.
    pub category: Option<CategoryName>,
}

impl TransactionBuilder {
    /// Set the merchant for the transaction.
    pub fn merchant(mut self, merchant: &str) -> Self {
        self.merchant = Some(merchant.to_owned());
        self
    }

    /// Set the description for the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    /// Set the account for the transaction.
    pub fn account(mut self, account: &str) -> Self {
        self.account = Some(account.to_owned());
        self
    }

    /// Set the category for the transaction.
    pub fn category(mut self, category: Option<CategoryName>) -> Self {
        self.category = category;
        self
    }

    /// Create the [Transaction] with the ID assigned by a store.
    pub fn finalise(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            date: self.date,
            amount: self.amount,
            merchant: self.merchant,
            description: self.description,
            account: self.account,
            category: self.category,
        }
    }
}
