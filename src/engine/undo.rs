use crate::{
    Error,
    database_id::BatchId,
    engine::{OverwrittenChange, RuleEngine, UndoResult},
    stores::{BatchStore, Ledger, TransactionStore},
};

impl<L: Ledger> RuleEngine<L> {
    /// Set every transaction changed by batch `batch_id` back to the category
    /// it held before the batch ran, and mark the batch as undone.
    ///
    /// Transactions are restored to the recorded snapshot even if their
    /// category was changed after the batch ran. Each such overwrite is
    /// logged and listed in [UndoResult::overwritten].
    ///
    /// # Errors
    ///
    /// Returns a:
    /// - [Error::BatchNotFound] if `batch_id` does not refer to a batch,
    /// - [Error::AlreadyUndone] if the batch has already been undone,
    /// - [Error::TransactionNotFound] if a changed transaction no longer exists,
    /// - or a store error.
    ///
    /// Nothing is reverted when an error is returned.
    pub fn undo(&self, batch_id: BatchId) -> Result<UndoResult, Error> {
        let start_time = std::time::Instant::now();
        let undone_at = self.now();

        let result = self.ledger.atomically(|scope| {
            let batch = scope.get_batch(batch_id)?;

            if batch.is_undone() {
                return Err(Error::AlreadyUndone(batch_id));
            }

            let mut overwritten = Vec::new();

            for change in &batch.changes {
                let current_category = scope
                    .set_category(change.transaction_id, change.previous_category.as_ref())?;
                // A later batch may have written the same category this batch did.
                let later_batch_id = scope.latest_change_after(change.transaction_id, batch_id)?;

                if later_batch_id.is_some()
                    || current_category.as_ref() != Some(&change.new_category)
                {
                    overwritten.push(OverwrittenChange {
                        transaction_id: change.transaction_id,
                        later_batch_id,
                        current_category,
                        restored_category: change.previous_category.clone(),
                    });
                }
            }

            scope.mark_undone(batch_id, undone_at)?;

            Ok(UndoResult {
                batch_id,
                transactions_reverted: batch.changes.len(),
                overwritten,
            })
        })?;

        for change in &result.overwritten {
            let current = change
                .current_category
                .as_ref()
                .map_or("no category", |category| category.as_ref());

            match change.later_batch_id {
                Some(later_batch_id) => tracing::warn!(
                    "Undo of batch {batch_id} overwrote transaction {} (\"{current}\"), \
                    which batch {later_batch_id} changed after it",
                    change.transaction_id
                ),
                None => tracing::warn!(
                    "Undo of batch {batch_id} overwrote transaction {} (\"{current}\"), \
                    which was changed manually after the batch ran",
                    change.transaction_id
                ),
            }
        }

        tracing::info!(
            "Undid batch {batch_id} in {}ms: {} transactions reverted, {} overwritten",
            start_time.elapsed().as_millis(),
            result.transactions_reverted,
            result.overwritten.len()
        );

        Ok(result)
    }
}
