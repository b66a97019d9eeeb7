//! Implements a struct that holds the state of the REST server.

use rusqlite::Connection;

use crate::{Error, SQLiteLedger, engine::RuleEngine};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The rule engine over the application database.
    pub engine: RuleEngine<SQLiteLedger>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection) -> Result<Self, Error> {
        Ok(Self::from_engine(RuleEngine::new(SQLiteLedger::open(
            db_connection,
        )?)))
    }

    /// Create a new [AppState] around an existing engine, e.g. one with a fixed clock.
    pub fn from_engine(engine: RuleEngine<SQLiteLedger>) -> Self {
        Self { engine }
    }
}
