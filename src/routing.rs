//! Application router configuration.

use axum::{
    Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    AppState, Error,
    batch::{get_batch_endpoint, list_batches_endpoint, undo_batch_endpoint},
    endpoints,
    rule::{apply_rule_endpoint, preview_rule_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::RULE_PREVIEW, get(preview_rule_endpoint))
        .route(endpoints::RULE_APPLY, post(apply_rule_endpoint))
        .route(endpoints::BATCHES, get(list_batches_endpoint))
        .route(endpoints::BATCH, get(get_batch_endpoint))
        .route(endpoints::BATCH_UNDO, post(undo_batch_endpoint))
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
