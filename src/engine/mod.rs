//! The retroactive rule engine.
//!
//! [RuleEngine] previews, applies and undoes rules over the transactions in a
//! [Ledger]. Every operation runs inside exactly one atomic scope, so the
//! engine holds no state between calls.

mod apply;
mod preview;
mod registry;
mod undo;

#[cfg(test)]
mod tests;

use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    category::CategoryName,
    database_id::{BatchId, RuleId, TransactionId},
    rule::{Rule, matches},
    stores::{Ledger, LedgerScope, TransactionQuery, TransactionStore},
    transaction::DateRange,
};

/// The number of batches listed when no limit is given.
pub const DEFAULT_BATCH_LIMIT: u32 = 50;

/// The largest number of batches a single listing returns.
pub const MAX_BATCH_LIMIT: u32 = 500;

/// Previews, applies and undoes rules over the stores of a [Ledger].
#[derive(Debug, Clone)]
pub struct RuleEngine<L: Ledger> {
    ledger: L,
    clock: fn() -> OffsetDateTime,
}

impl<L: Ledger> RuleEngine<L> {
    /// Create an engine that timestamps batches with the current UTC time.
    pub fn new(ledger: L) -> Self {
        Self::with_clock(ledger, OffsetDateTime::now_utc)
    }

    /// Create an engine that timestamps batches with `clock`.
    pub fn with_clock(ledger: L, clock: fn() -> OffsetDateTime) -> Self {
        Self { ledger, clock }
    }

    /// The ledger the engine reads and writes.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    fn now(&self) -> OffsetDateTime {
        (self.clock)()
    }
}

/// One transaction a rule matched, and what the rule would do to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewEntry {
    /// The matched transaction.
    pub transaction_id: TransactionId,
    /// When the transaction happened.
    pub date: Date,
    /// Who the transaction was with, if known.
    pub merchant: Option<String>,
    /// The category the transaction holds now.
    pub previous_category: Option<CategoryName>,
    /// The category the rule assigns.
    pub new_category: CategoryName,
    /// Whether the transaction already holds `new_category`.
    pub no_op: bool,
}

/// What a rule would change if it were applied now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewResult {
    /// The previewed rule.
    pub rule_id: RuleId,
    /// The category the rule assigns.
    pub category: CategoryName,
    /// The date range the preview was run over, `None` for all dates.
    pub date_range: Option<DateRange>,
    /// The number of transactions the rule matched, including no-ops.
    pub matched_count: usize,
    /// The number of matched transactions whose category would change.
    pub would_change_count: usize,
    /// Matched transactions ordered by date, then by ID.
    pub entries: Vec<PreviewEntry>,
}

impl PreviewResult {
    /// The IDs of the transactions whose category would change, in order.
    pub fn would_change_ids(&self) -> Vec<TransactionId> {
        self.entries
            .iter()
            .filter(|entry| !entry.no_op)
            .map(|entry| entry.transaction_id)
            .collect()
    }
}

/// A transaction whose category was changed after its batch ran, and that
/// undo set back to the batch's snapshot anyway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverwrittenChange {
    /// The transaction that was overwritten.
    pub transaction_id: TransactionId,
    /// The later, still active batch that changed the transaction, or `None`
    /// if the change was made outside the rule engine.
    pub later_batch_id: Option<BatchId>,
    /// The category the transaction held before the undo.
    pub current_category: Option<CategoryName>,
    /// The category the undo restored.
    pub restored_category: Option<CategoryName>,
}

/// The outcome of undoing a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndoResult {
    /// The batch that was undone.
    pub batch_id: BatchId,
    /// The number of transactions set back to their previous category.
    pub transactions_reverted: usize,
    /// Reverted transactions that had been changed again since the batch ran.
    pub overwritten: Vec<OverwrittenChange>,
}

/// Run `rule` over the transactions in `date_range`.
///
/// This is the only matching code path. Preview and apply both go through it,
/// so apply changes exactly what a preview in the same state reports.
fn evaluate_rule(
    scope: &dyn LedgerScope,
    rule: &Rule,
    date_range: Option<DateRange>,
) -> Result<Vec<PreviewEntry>, Error> {
    rule.condition.validate()?;

    let transactions = scope.query_transactions(&TransactionQuery { date_range })?;

    let entries = transactions
        .into_iter()
        .filter(|transaction| matches(&rule.condition, transaction))
        .map(|transaction| PreviewEntry {
            no_op: transaction.category.as_ref() == Some(&rule.category),
            transaction_id: transaction.id,
            date: transaction.date,
            merchant: transaction.merchant,
            previous_category: transaction.category,
            new_category: rule.category.clone(),
        })
        .collect();

    Ok(entries)
}
