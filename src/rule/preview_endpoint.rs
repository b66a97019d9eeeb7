//! The HTTP handler for previewing a rule.

use axum::{Json, extract::State};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, DateRange, Error, PreviewResult, RuleId,
    extract::{Path, Query},
};

/// The optional date bounds for running a rule, e.g. `?start=2025-01-01&end=2025-01-31`.
///
/// Either both bounds or neither must be given.
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    /// The first day to include.
    pub start: Option<Date>,
    /// The last day to include.
    pub end: Option<Date>,
}

/// A route handler for previewing what a rule would change, without changing anything.
pub async fn preview_rule_endpoint(
    State(state): State<AppState>,
    Path(rule_id): Path<RuleId>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<PreviewResult>, Error> {
    let date_range = DateRange::from_bounds(query.start, query.end)?;

    state.engine.preview(rule_id, date_range).map(Json)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::Value;

    use crate::{
        build_router,
        endpoints::{self, format_endpoint},
        test_utils::seeded_state,
    };

    #[tokio::test]
    async fn preview_returns_matches() {
        let (state, fixture) = seeded_state();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .get(&format_endpoint(endpoints::RULE_PREVIEW, fixture.rule_id))
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["matched_count"], 2);
        assert_eq!(body["would_change_count"], 1);
        assert_eq!(body["entries"][0]["transaction_id"], fixture.t1);
        assert_eq!(body["entries"][0]["previous_category"], Value::Null);
        assert_eq!(body["entries"][0]["new_category"], "Dining");
        assert_eq!(body["entries"][1]["no_op"], true);
    }

    #[tokio::test]
    async fn preview_with_date_range() {
        let (state, fixture) = seeded_state();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .get(&format_endpoint(endpoints::RULE_PREVIEW, fixture.rule_id))
            .add_query_param("start", "2025-10-02")
            .add_query_param("end", "2025-10-31")
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["matched_count"], 1);
        assert_eq!(body["entries"][0]["transaction_id"], fixture.t2);
    }

    #[tokio::test]
    async fn preview_rejects_half_open_range() {
        let (state, fixture) = seeded_state();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .get(&format_endpoint(endpoints::RULE_PREVIEW, fixture.rule_id))
            .add_query_param("start", "2025-10-02")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn preview_unknown_rule_is_not_found() {
        let (state, _) = seeded_state();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .get(&format_endpoint(endpoints::RULE_PREVIEW, 999))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["kind"], "not_found");
    }

    #[tokio::test]
    async fn malformed_rule_id_is_json_error() {
        let (state, _) = seeded_state();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server.get("/api/rules/abc/preview").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn malformed_date_is_json_error() {
        let (state, fixture) = seeded_state();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .get(&format_endpoint(endpoints::RULE_PREVIEW, fixture.rule_id))
            .add_query_param("start", "yesterday")
            .add_query_param("end", "2025-10-31")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["kind"], "invalid_input");
    }
}
