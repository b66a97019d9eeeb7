//! Implements a SQLite backed rule store.

use rusqlite::{Connection, Row, types::Type};

use crate::{
    Error,
    database_id::RuleId,
    db::{CreateTable, MapRow},
    rule::{NewRule, Rule},
    stores::{RuleStore, sqlite::SQLiteStore},
};

impl RuleStore for SQLiteStore<'_> {
    /// Create a rule in the database.
    ///
    /// The condition is stored as JSON.
    ///
    /// # Errors
    /// This function will return an [Error::InvalidCondition] if the condition
    /// does not validate, or an [Error::SqlError] if there is an SQL error.
    fn create_rule(&mut self, rule: NewRule) -> Result<Rule, Error> {
        rule.validate()?;

        let condition = serde_json::to_string(&rule.condition)
            .map_err(|error| Error::InvalidCondition(error.to_string()))?;

        self.connection.execute(
            "INSERT INTO rule (name, condition, category, active) VALUES (?1, ?2, ?3, ?4);",
            (&rule.name, &condition, &rule.category, rule.active),
        )?;

        let id = self.connection.last_insert_rowid();

        Ok(rule.finalise(id))
    }

    /// Retrieve a rule in the database by `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::RuleNotFound] if `id` does not refer to a rule,
    /// - [Error::CorruptRecord] if the stored condition is not valid,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn get_rule(&self, id: RuleId) -> Result<Rule, Error> {
        self.connection
            .prepare("SELECT id, name, condition, category, active FROM rule WHERE id = :id;")?
            .query_row(&[(":id", &id)], Rule::map_row)
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::RuleNotFound(id),
                error => error.into(),
            })
    }
}

impl CreateTable for Rule {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS rule (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                condition TEXT NOT NULL,
                category TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            );",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Rule {
    type ReturnType = Rule;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let id = row.get(offset)?;
        let name = row.get(offset + 1)?;
        let raw_condition: String = row.get(offset + 2)?;
        let condition = serde_json::from_str(&raw_condition).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(offset + 2, Type::Text, Box::new(error))
        })?;
        let category = row.get(offset + 3)?;
        let active = row.get(offset + 4)?;

        Ok(Rule {
            id,
            name,
            condition,
            category,
            active,
        })
    }
}
