//! An in-memory [Ledger] for tests and tooling.
//!
//! Each atomic scope works on a copy of the state, and the copy replaces the
//! live state only when the scope succeeds. A [FailurePoint] can be armed to
//! make a write fail part way through a scope.

use std::{collections::BTreeMap, sync::Mutex};

use time::OffsetDateTime;

use crate::{
    Error,
    batch::{Batch, BatchQuery, BatchSummary, NewBatch},
    category::CategoryName,
    database_id::{BatchId, RuleId, TransactionId},
    rule::{NewRule, Rule},
    stores::{
        BatchStore, Ledger, LedgerScope, RuleStore, TransactionQuery, TransactionStore,
    },
    transaction::{Transaction, TransactionBuilder},
};

/// A write that an armed [MemoryLedger] rejects with [Error::StoreFailure].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// Fail when the category of this transaction is set.
    SetCategory(TransactionId),
    /// Fail when a batch is stored.
    CreateBatch,
    /// Fail when a batch is marked as undone.
    MarkUndone,
}

#[derive(Debug, Clone)]
struct MemoryState {
    rules: BTreeMap<RuleId, Rule>,
    transactions: BTreeMap<TransactionId, Transaction>,
    batches: BTreeMap<BatchId, Batch>,
    next_rule_id: RuleId,
    next_transaction_id: TransactionId,
    next_batch_id: BatchId,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            rules: BTreeMap::new(),
            transactions: BTreeMap::new(),
            batches: BTreeMap::new(),
            next_rule_id: 1,
            next_transaction_id: 1,
            next_batch_id: 1,
        }
    }
}

/// A [Ledger] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
    failure_point: Mutex<Option<FailurePoint>>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later write at `point` fail until [MemoryLedger::clear_failure] is called.
    pub fn fail_at(&self, point: FailurePoint) {
        if let Ok(mut failure_point) = self.failure_point.lock() {
            *failure_point = Some(point);
        }
    }

    /// Disarm the failure point set with [MemoryLedger::fail_at].
    pub fn clear_failure(&self) {
        if let Ok(mut failure_point) = self.failure_point.lock() {
            *failure_point = None;
        }
    }
}

impl Ledger for MemoryLedger {
    fn atomically<T, F>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce(&mut dyn LedgerScope) -> Result<T, Error>,
    {
        let failure_point = *self
            .failure_point
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        // Held for the whole scope so scopes never interleave.
        let mut state = self
            .state
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire memory ledger lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let mut scope = MemoryScope {
            state: state.clone(),
            failure_point,
        };

        let value = operation(&mut scope)?;
        *state = scope.state;

        Ok(value)
    }
}

struct MemoryScope {
    state: MemoryState,
    failure_point: Option<FailurePoint>,
}

impl MemoryScope {
    fn check(&self, point: FailurePoint) -> Result<(), Error> {
        if self.failure_point == Some(point) {
            return Err(Error::StoreFailure(format!("injected failure at {point:?}")));
        }

        Ok(())
    }
}

impl RuleStore for MemoryScope {
    fn create_rule(&mut self, rule: NewRule) -> Result<Rule, Error> {
        rule.validate()?;

        let id = self.state.next_rule_id;
        self.state.next_rule_id += 1;

        let rule = rule.finalise(id);
        self.state.rules.insert(id, rule.clone());

        Ok(rule)
    }

    fn get_rule(&self, id: RuleId) -> Result<Rule, Error> {
        self.state
            .rules
            .get(&id)
            .cloned()
            .ok_or(Error::RuleNotFound(id))
    }
}

impl TransactionStore for MemoryScope {
    fn create_transaction(&mut self, builder: TransactionBuilder) -> Result<Transaction, Error> {
        let id = self.state.next_transaction_id;
        self.state.next_transaction_id += 1;

        let transaction = builder.finalise(id);
        self.state.transactions.insert(id, transaction.clone());

        Ok(transaction)
    }

    fn get_transaction(&self, id: TransactionId) -> Result<Transaction, Error> {
        self.state
            .transactions
            .get(&id)
            .cloned()
            .ok_or(Error::TransactionNotFound(id))
    }

    fn query_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, Error> {
        let mut transactions: Vec<Transaction> = self
            .state
            .transactions
            .values()
            .filter(|transaction| {
                query
                    .date_range
                    .is_none_or(|range| range.contains(transaction.date))
            })
            .cloned()
            .collect();

        transactions.sort_by_key(|transaction| (transaction.date, transaction.id));

        Ok(transactions)
    }

    fn set_category(
        &mut self,
        id: TransactionId,
        category: Option<&CategoryName>,
    ) -> Result<Option<CategoryName>, Error> {
        self.check(FailurePoint::SetCategory(id))?;

        let transaction = self
            .state
            .transactions
            .get_mut(&id)
            .ok_or(Error::TransactionNotFound(id))?;

        Ok(std::mem::replace(
            &mut transaction.category,
            category.cloned(),
        ))
    }
}

impl BatchStore for MemoryScope {
    fn create_batch(&mut self, batch: NewBatch) -> Result<Batch, Error> {
        self.check(FailurePoint::CreateBatch)?;

        let id = self.state.next_batch_id;
        self.state.next_batch_id += 1;

        let batch = batch.finalise(id);
        self.state.batches.insert(id, batch.clone());

        Ok(batch)
    }

    fn get_batch(&self, id: BatchId) -> Result<Batch, Error> {
        self.state
            .batches
            .get(&id)
            .cloned()
            .ok_or(Error::BatchNotFound(id))
    }

    fn mark_undone(&mut self, id: BatchId, undone_at: OffsetDateTime) -> Result<(), Error> {
        self.check(FailurePoint::MarkUndone)?;

        let batch = self
            .state
            .batches
            .get_mut(&id)
            .ok_or(Error::BatchNotFound(id))?;

        if batch.is_undone() {
            return Err(Error::AlreadyUndone(id));
        }

        batch.undone_at = Some(undone_at);

        Ok(())
    }

    fn list_batches(&self, query: &BatchQuery) -> Result<Vec<BatchSummary>, Error> {
        Ok(self
            .state
            .batches
            .values()
            .rev()
            .filter(|batch| query.rule_id.is_none_or(|rule_id| batch.rule_id == rule_id))
            .filter(|batch| query.include_undone || !batch.is_undone())
            .take(query.limit as usize)
            .map(Batch::summary)
            .collect())
    }

    fn latest_change_after(
        &self,
        transaction_id: TransactionId,
        batch_id: BatchId,
    ) -> Result<Option<BatchId>, Error> {
        Ok(self
            .state
            .batches
            .range(batch_id + 1..)
            .rev()
            .find(|(_, batch)| {
                !batch.is_undone()
                    && batch
                        .changes
                        .iter()
                        .any(|change| change.transaction_id == transaction_id)
            })
            .map(|(id, _)| *id))
    }
}
