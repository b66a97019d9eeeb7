//! Defines the batch store trait.

use time::OffsetDateTime;

use crate::{
    Error,
    batch::{Batch, BatchQuery, BatchSummary, NewBatch},
    database_id::{BatchId, TransactionId},
};

/// Handles the creation, retrieval and undoing of batches.
///
/// Batches are never deleted.
pub trait BatchStore {
    /// Store a batch together with all of its changes.
    fn create_batch(&mut self, batch: NewBatch) -> Result<Batch, Error>;

    /// Retrieve a batch with its changes, or [Error::BatchNotFound] if `id`
    /// does not refer to a batch.
    fn get_batch(&self, id: BatchId) -> Result<Batch, Error>;

    /// Mark a batch as undone at `undone_at`.
    ///
    /// Returns [Error::BatchNotFound] if `id` does not refer to a batch and
    /// [Error::AlreadyUndone] if the batch was already undone.
    fn mark_undone(&mut self, id: BatchId, undone_at: OffsetDateTime) -> Result<(), Error>;

    /// List batch summaries in the way defined by `query`, newest first.
    fn list_batches(&self, query: &BatchQuery) -> Result<Vec<BatchSummary>, Error>;

    /// Find the newest active batch created after `batch_id` that changed
    /// `transaction_id`, if any.
    fn latest_change_after(
        &self,
        transaction_id: TransactionId,
        batch_id: BatchId,
    ) -> Result<Option<BatchId>, Error>;
}
