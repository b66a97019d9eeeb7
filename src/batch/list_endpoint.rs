//! The HTTP handlers for browsing batches.

use axum::{Json, extract::State};
use serde::Deserialize;

use crate::{
    AppState, Batch, BatchId, BatchSummary, Error, RuleId,
    extract::{Path, Query},
};

/// The filters for listing batches, e.g. `?rule_id=3&include_undone=true&limit=10`.
#[derive(Debug, Default, Deserialize)]
pub struct BatchListQuery {
    /// Only list batches produced by this rule.
    pub rule_id: Option<RuleId>,
    /// Whether to include batches that have been undone.
    #[serde(default)]
    pub include_undone: bool,
    /// The maximum number of batches to return.
    pub limit: Option<i64>,
}

/// A route handler for listing batches, newest first.
pub async fn list_batches_endpoint(
    State(state): State<AppState>,
    Query(query): Query<BatchListQuery>,
) -> Result<Json<Vec<BatchSummary>>, Error> {
    state
        .engine
        .list_batches(query.rule_id, query.include_undone, query.limit)
        .map(Json)
}

/// A route handler for getting a batch with all of its changes.
pub async fn get_batch_endpoint(
    State(state): State<AppState>,
    Path(batch_id): Path<BatchId>,
) -> Result<Json<Batch>, Error> {
    state.engine.get_batch(batch_id).map(Json)
}
