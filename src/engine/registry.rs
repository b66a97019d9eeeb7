use crate::{
    Error,
    batch::{Batch, BatchQuery, BatchSummary},
    database_id::{BatchId, RuleId},
    engine::{DEFAULT_BATCH_LIMIT, MAX_BATCH_LIMIT, RuleEngine},
    stores::{BatchStore, Ledger},
};

impl<L: Ledger> RuleEngine<L> {
    /// List batches newest first.
    ///
    /// `limit` defaults to [DEFAULT_BATCH_LIMIT] and is clamped to
    /// [MAX_BATCH_LIMIT]. Undone batches are only listed when
    /// `include_undone` is set.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidLimit] if `limit` is zero or negative, or a
    /// store error.
    pub fn list_batches(
        &self,
        rule_id: Option<RuleId>,
        include_undone: bool,
        limit: Option<i64>,
    ) -> Result<Vec<BatchSummary>, Error> {
        let query = BatchQuery {
            rule_id,
            include_undone,
            limit: resolve_limit(limit)?,
        };

        self.ledger.atomically(|scope| scope.list_batches(&query))
    }

    /// Retrieve a batch with its changes in the order they were made.
    ///
    /// # Errors
    ///
    /// Returns an [Error::BatchNotFound] if `batch_id` does not refer to a batch.
    pub fn get_batch(&self, batch_id: BatchId) -> Result<Batch, Error> {
        self.ledger.atomically(|scope| scope.get_batch(batch_id))
    }
}

fn resolve_limit(limit: Option<i64>) -> Result<u32, Error> {
    match limit {
        None => Ok(DEFAULT_BATCH_LIMIT),
        Some(limit) if limit <= 0 => Err(Error::InvalidLimit(limit)),
        Some(limit) => Ok(u32::try_from(limit)
            .unwrap_or(MAX_BATCH_LIMIT)
            .min(MAX_BATCH_LIMIT)),
    }
}
