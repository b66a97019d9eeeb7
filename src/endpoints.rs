//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/batches/{batch_id}', use [format_endpoint].

/// The route for previewing what a rule would change.
pub const RULE_PREVIEW: &str = "/api/rules/{rule_id}/preview";
/// The route for applying a rule as a new batch.
pub const RULE_APPLY: &str = "/api/rules/{rule_id}/apply";
/// The route for listing batches.
pub const BATCHES: &str = "/api/batches";
/// The route for getting a single batch with its changes.
pub const BATCH: &str = "/api/batches/{batch_id}";
/// The route for undoing a batch.
pub const BATCH_UNDO: &str = "/api/batches/{batch_id}/undo";

/// Replace the first `{parameter}` in `endpoint_path` with `id`.
///
/// Returns `endpoint_path` unchanged if it has no parameter.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| param_start + offset + 1);

    format!(
        "{}{id}{}",
        &endpoint_path[..param_start],
        &endpoint_path[param_end..]
    )
}
