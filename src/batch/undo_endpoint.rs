//! The HTTP handler for undoing a batch.

use axum::{Json, extract::State};

use crate::{AppState, BatchId, Error, UndoResult, extract::Path};

/// A route handler for undoing a batch.
///
/// Responds with `409 Conflict` if the batch has already been undone.
pub async fn undo_batch_endpoint(
    State(state): State<AppState>,
    Path(batch_id): Path<BatchId>,
) -> Result<Json<UndoResult>, Error> {
    state.engine.undo(batch_id).map(Json)
}
