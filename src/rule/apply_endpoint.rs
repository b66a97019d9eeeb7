//! The HTTP handler for applying a rule.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use time::Date;

use crate::{AppState, Batch, DateRange, Error, RuleId, TransactionId, extract::Path};

/// The body of an apply request.
#[derive(Debug, Default, Deserialize)]
pub struct ApplyRequest {
    /// The first day to include.
    pub start: Option<Date>,
    /// The last day to include.
    pub end: Option<Date>,
    /// The transactions a preview said would change.
    ///
    /// When given, the rule is only applied if it would still change exactly
    /// these transactions.
    pub expected_transaction_ids: Option<Vec<TransactionId>>,
}

/// A route handler for applying a rule and recording the changes as a batch.
///
/// The body is optional. A request without one applies the rule over all dates.
///
/// Responds with `201 Created` and the new batch.
pub async fn apply_rule_endpoint(
    State(state): State<AppState>,
    Path(rule_id): Path<RuleId>,
    body: Result<Option<Json<ApplyRequest>>, JsonRejection>,
) -> Result<(StatusCode, Json<Batch>), Error> {
    let request = body?
        .map(|Json(request)| request)
        .unwrap_or_default();
    let date_range = DateRange::from_bounds(request.start, request.end)?;

    let batch = match request.expected_transaction_ids {
        Some(expected) => state.engine.apply_expecting(rule_id, date_range, &expected)?,
        None => state.engine.apply(rule_id, date_range)?,
    };

    Ok((StatusCode::CREATED, Json(batch)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        build_router,
        endpoints::{self, format_endpoint},
        test_utils::seeded_state,
    };

    #[tokio::test]
    async fn apply_creates_batch() {
        let (state, fixture) = seeded_state();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .post(&format_endpoint(endpoints::RULE_APPLY, fixture.rule_id))
            .json(&json!({}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["rule_id"], fixture.rule_id);
        assert_eq!(body["undone_at"], Value::Null);
        assert_eq!(body["changes"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["changes"][0]["transaction_id"], fixture.t1);
        assert_eq!(body["changes"][0]["previous_category"], Value::Null);
    }

    #[tokio::test]
    async fn apply_twice_has_nothing_to_apply() {
        let (state, fixture) = seeded_state();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");
        let path = format_endpoint(endpoints::RULE_APPLY, fixture.rule_id);

        server.post(&path).json(&json!({})).await.assert_status(StatusCode::CREATED);
        let response = server.post(&path).json(&json!({})).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn apply_with_stale_expectation_conflicts() {
        let (state, fixture) = seeded_state();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .post(&format_endpoint(endpoints::RULE_APPLY, fixture.rule_id))
            .json(&json!({ "expected_transaction_ids": [fixture.t1, fixture.t3] }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<Value>()["kind"], "preview_mismatch");
    }

    #[tokio::test]
    async fn apply_with_matching_expectation_succeeds() {
        let (state, fixture) = seeded_state();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .post(&format_endpoint(endpoints::RULE_APPLY, fixture.rule_id))
            .json(&json!({
                "start": "2025-10-01",
                "end": "2025-10-31",
                "expected_transaction_ids": [fixture.t1],
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn apply_without_body_uses_all_dates() {
        let (state, fixture) = seeded_state();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .post(&format_endpoint(endpoints::RULE_APPLY, fixture.rule_id))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["changes"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["changes"][0]["transaction_id"], fixture.t1);
    }

    #[tokio::test]
    async fn apply_with_malformed_body_is_json_error() {
        let (state, fixture) = seeded_state();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .post(&format_endpoint(endpoints::RULE_APPLY, fixture.rule_id))
            .json(&json!({ "expected_transaction_ids": "all of them" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["kind"], "invalid_input");
    }
}
