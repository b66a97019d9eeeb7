//! Rulebatch is the retroactive rule engine of a personal-finance dashboard.
//!
//! Given a categorization rule, the engine can:
//! - preview which historical transactions the rule would recategorize,
//!   without writing anything,
//! - apply the rule as one atomic, reversible batch,
//! - undo a batch, restoring every affected transaction to the category it
//!   held before the batch ran.
//!
//! The engine talks to its storage through the traits in [stores], so it can
//! run against SQLite ([SQLiteLedger]) or the in-memory [MemoryLedger].
//! A thin JSON API over the engine is provided by [build_router].

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod app_state;
mod batch;
mod category;
mod database_id;
mod db;
mod endpoints;
mod engine;
mod extract;
mod logging;
mod routing;
mod rule;
pub mod stores;
#[cfg(test)]
mod test_utils;
mod transaction;

pub use app_state::AppState;
pub use batch::{Batch, BatchChange, BatchQuery, BatchSummary, NewBatch};
pub use category::CategoryName;
pub use database_id::{BatchId, DatabaseId, RuleId, TransactionId};
pub use db::initialize as initialize_db;
pub use engine::{
    DEFAULT_BATCH_LIMIT, MAX_BATCH_LIMIT, OverwrittenChange, PreviewEntry, PreviewResult,
    RuleEngine, UndoResult,
};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use rule::{Condition, NewRule, Rule, TextField, TextMatch, matches};
pub use stores::{MemoryLedger, SQLiteLedger};
pub use transaction::{DateRange, Transaction, TransactionBuilder};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The rule ID does not refer to a stored rule.
    #[error("rule {0} could not be found")]
    RuleNotFound(RuleId),

    /// The batch ID does not refer to a stored batch.
    #[error("batch {0} could not be found")]
    BatchNotFound(BatchId),

    /// A batch refers to a transaction that no longer exists.
    #[error("transaction {0} could not be found")]
    TransactionNotFound(TransactionId),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The start of a date range is after its end, or only one bound was given.
    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    /// A request path, query string or body could not be parsed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A batch listing was requested with a limit that is zero or negative.
    #[error("the limit must be a positive number, got {0}")]
    InvalidLimit(i64),

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// A rule predicate cannot be evaluated, e.g. an empty text pattern.
    #[error("invalid rule condition: {0}")]
    InvalidCondition(String),

    /// Tried to apply a rule that has been switched off.
    ///
    /// Inactive rules can still be previewed.
    #[error("rule {0} is inactive and cannot be applied")]
    InactiveRule(RuleId),

    /// Applying the rule would not change any transaction, so no batch was created.
    #[error("rule {0} would not change any transactions")]
    NothingToApply(RuleId),

    /// Tried to undo a batch that has already been undone.
    ///
    /// Undone is a terminal state, a batch cannot be undone twice.
    #[error("batch {0} has already been undone")]
    AlreadyUndone(BatchId),

    /// The transactions a rule would change are not the ones the caller previewed.
    ///
    /// This means the data changed between the preview and the apply. The
    /// caller should preview again before applying.
    #[error(
        "the changes for rule {rule_id} no longer match the preview: \
        {expected} previewed, {actual} found"
    )]
    PreviewMismatch {
        /// The rule that was being applied.
        rule_id: RuleId,
        /// How many transactions the preview said would change.
        expected: usize,
        /// How many transactions would change now.
        actual: usize,
    },

    /// The store rejected a write. Nothing from the surrounding atomic scope was committed.
    #[error("the store rejected the write: {0}")]
    StoreFailure(String),

    /// A stored record could not be decoded, e.g. a rule predicate that is not valid JSON.
    #[error("a stored record is corrupt: {0}")]
    CorruptRecord(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

/// The machine-checkable category of an [Error].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A rule, batch or transaction ID did not resolve.
    NotFound,
    /// The request was malformed or cannot be carried out as asked.
    InvalidInput,
    /// Undo was requested on a batch that is already undone.
    AlreadyUndone,
    /// The atomic commit failed. Nothing was written.
    ConflictOrStoreFailure,
    /// The data changed between a preview and the apply that followed it.
    PreviewMismatch,
}

impl Error {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RuleNotFound(_)
            | Error::BatchNotFound(_)
            | Error::TransactionNotFound(_)
            | Error::NotFound => ErrorKind::NotFound,
            Error::InvalidDateRange(_)
            | Error::InvalidRequest(_)
            | Error::InvalidLimit(_)
            | Error::EmptyCategoryName
            | Error::InvalidCondition(_)
            | Error::InactiveRule(_)
            | Error::NothingToApply(_) => ErrorKind::InvalidInput,
            Error::AlreadyUndone(_) => ErrorKind::AlreadyUndone,
            Error::PreviewMismatch { .. } => ErrorKind::PreviewMismatch,
            Error::StoreFailure(_)
            | Error::CorruptRecord(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError => ErrorKind::ConflictOrStoreFailure,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            rusqlite::Error::FromSqlConversionFailure(column, _, error) => {
                tracing::error!("could not decode column {column}: {error}");
                Error::CorruptRecord(format!("column {column}: {error}"))
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON body sent to clients when a request fails.
#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: ErrorKind,
    reason: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::AlreadyUndone | ErrorKind::PreviewMismatch => StatusCode::CONFLICT,
            ErrorKind::ConflictOrStoreFailure => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let reason = match kind {
            // Store errors may leak SQL details, so they are only logged.
            ErrorKind::ConflictOrStoreFailure => {
                tracing::error!("An unexpected error occurred: {}", self);
                "An unexpected error occurred and nothing was changed, check the server logs for more details."
                    .to_owned()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorBody { kind, reason })).into_response()
    }
}
