use std::collections::BTreeSet;

use crate::{
    Error, ErrorKind,
    batch::{Batch, BatchChange, NewBatch},
    database_id::{RuleId, TransactionId},
    engine::{PreviewResult, RuleEngine, evaluate_rule},
    stores::{BatchStore, Ledger, RuleStore, TransactionStore},
    transaction::DateRange,
};

impl<L: Ledger> RuleEngine<L> {
    /// Apply the rule `rule_id` to every matching transaction in `date_range`
    /// and record the changes as one batch.
    ///
    /// The category writes, the batch and its change rows are committed
    /// together. Matches that already hold the rule's category are skipped.
    ///
    /// # Errors
    ///
    /// Returns a:
    /// - [Error::RuleNotFound] if `rule_id` does not refer to a rule,
    /// - [Error::InactiveRule] if the rule is switched off,
    /// - [Error::NothingToApply] if no transaction would change,
    /// - or a store error, in which case nothing was written.
    pub fn apply(&self, rule_id: RuleId, date_range: Option<DateRange>) -> Result<Batch, Error> {
        self.apply_inner(rule_id, date_range, None)
    }

    /// Apply the rule from `preview`, but only if it would still change
    /// exactly the transactions the preview reported.
    ///
    /// # Errors
    ///
    /// Returns an [Error::PreviewMismatch] if the data changed since the
    /// preview was made, otherwise the same errors as [RuleEngine::apply].
    pub fn apply_previewed(&self, preview: &PreviewResult) -> Result<Batch, Error> {
        self.apply_expecting(
            preview.rule_id,
            preview.date_range,
            &preview.would_change_ids(),
        )
    }

    /// Apply the rule `rule_id`, but only if the transactions it would change
    /// are exactly `expected_transaction_ids`.
    ///
    /// # Errors
    ///
    /// Same as [RuleEngine::apply_previewed].
    pub fn apply_expecting(
        &self,
        rule_id: RuleId,
        date_range: Option<DateRange>,
        expected_transaction_ids: &[TransactionId],
    ) -> Result<Batch, Error> {
        self.apply_inner(rule_id, date_range, Some(expected_transaction_ids))
    }

    fn apply_inner(
        &self,
        rule_id: RuleId,
        date_range: Option<DateRange>,
        expected_transaction_ids: Option<&[TransactionId]>,
    ) -> Result<Batch, Error> {
        let start_time = std::time::Instant::now();
        let created_at = self.now();

        let result = self.ledger.atomically(|scope| {
            let rule = scope.get_rule(rule_id)?;

            if !rule.active {
                return Err(Error::InactiveRule(rule_id));
            }

            let targets: Vec<TransactionId> = evaluate_rule(scope, &rule, date_range)?
                .into_iter()
                .filter(|entry| !entry.no_op)
                .map(|entry| entry.transaction_id)
                .collect();

            if let Some(expected_transaction_ids) = expected_transaction_ids {
                let expected: BTreeSet<TransactionId> =
                    expected_transaction_ids.iter().copied().collect();
                let actual: BTreeSet<TransactionId> = targets.iter().copied().collect();

                if expected != actual {
                    return Err(Error::PreviewMismatch {
                        rule_id,
                        expected: expected.len(),
                        actual: actual.len(),
                    });
                }
            }

            if targets.is_empty() {
                return Err(Error::NothingToApply(rule_id));
            }

            let mut changes = Vec::with_capacity(targets.len());

            for transaction_id in targets {
                let previous_category = scope.set_category(transaction_id, Some(&rule.category))?;

                changes.push(BatchChange {
                    transaction_id,
                    previous_category,
                    new_category: rule.category.clone(),
                });
            }

            scope.create_batch(NewBatch {
                rule_id,
                created_at,
                changes,
            })
        });

        match result {
            Ok(batch) => {
                tracing::info!(
                    "Applied rule {rule_id} as batch {} in {}ms: {} transactions changed",
                    batch.id,
                    start_time.elapsed().as_millis(),
                    batch.changes.len()
                );
                Ok(batch)
            }
            Err(error) => {
                if error.kind() == ErrorKind::ConflictOrStoreFailure {
                    tracing::error!(
                        "Failed to apply rule {rule_id} after {}ms, nothing was changed: {error}",
                        start_time.elapsed().as_millis()
                    );
                }
                Err(error)
            }
        }
    }
}
