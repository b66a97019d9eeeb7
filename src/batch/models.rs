use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    category::CategoryName,
    database_id::{BatchId, RuleId, TransactionId},
};

/// One transaction's category before and after a rule was applied.
///
/// `previous_category` is the exact value the transaction held immediately
/// before the change, which is what undo restores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchChange {
    /// The transaction that was recategorized.
    pub transaction_id: TransactionId,
    /// The category before the change.
    pub previous_category: Option<CategoryName>,
    /// The category the rule assigned.
    pub new_category: CategoryName,
}

/// The record of one rule application and every change it made.
///
/// A batch is created with all of its changes in one atomic write, can be
/// undone once, and is never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// The ID of the batch.
    pub id: BatchId,
    /// The rule that produced this batch.
    pub rule_id: RuleId,
    /// When the rule was applied.
    pub created_at: OffsetDateTime,
    /// When the batch was undone, `None` while the batch is active.
    pub undone_at: Option<OffsetDateTime>,
    /// The changes in the order they were made.
    pub changes: Vec<BatchChange>,
}

impl Batch {
    /// Whether the batch has been undone.
    pub fn is_undone(&self) -> bool {
        self.undone_at.is_some()
    }

    /// The batch without its change rows.
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            id: self.id,
            rule_id: self.rule_id,
            created_at: self.created_at,
            undone: self.is_undone(),
            undone_at: self.undone_at,
            change_count: self.changes.len(),
        }
    }
}

/// A batch that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBatch {
    /// The rule that produced this batch.
    pub rule_id: RuleId,
    /// When the rule was applied.
    pub created_at: OffsetDateTime,
    /// The changes in the order they were made.
    pub changes: Vec<BatchChange>,
}

impl NewBatch {
    /// Create the [Batch] with the ID assigned by a store.
    pub fn finalise(self, id: BatchId) -> Batch {
        Batch {
            id,
            rule_id: self.rule_id,
            created_at: self.created_at,
            undone_at: None,
            changes: self.changes,
        }
    }
}

/// A batch as shown in listings: everything except the change rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// The ID of the batch.
    pub id: BatchId,
    /// The rule that produced the batch.
    pub rule_id: RuleId,
    /// When the rule was applied.
    pub created_at: OffsetDateTime,
    /// Whether the batch has been undone.
    pub undone: bool,
    /// When the batch was undone.
    pub undone_at: Option<OffsetDateTime>,
    /// The number of transactions the batch changed.
    pub change_count: usize,
}

/// Defines which batches a store should list.
///
/// Stores return matching batches newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchQuery {
    /// Only list batches produced by this rule.
    pub rule_id: Option<RuleId>,
    /// Whether undone batches should be listed.
    pub include_undone: bool,
    /// The maximum number of batches to return.
    pub limit: u32,
}
