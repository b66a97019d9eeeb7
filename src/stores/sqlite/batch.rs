//! Implements a SQLite backed batch store.

use rusqlite::{
    Connection, OptionalExtension, Row, params_from_iter,
    types::{Type, Value},
};
use time::OffsetDateTime;

use crate::{
    Error,
    batch::{Batch, BatchChange, BatchQuery, BatchSummary, NewBatch},
    database_id::{BatchId, TransactionId},
    db::{CreateTable, MapRow},
    stores::{BatchStore, sqlite::SQLiteStore},
};

impl BatchStore for SQLiteStore<'_> {
    /// Insert the batch row and one `batch_change` row per change.
    ///
    /// The rows are only atomic with respect to each other when the store
    /// wraps a SQLite transaction.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is an SQL error.
    fn create_batch(&mut self, batch: NewBatch) -> Result<Batch, Error> {
        self.connection.execute(
            "INSERT INTO batch (rule_id, created_at) VALUES (?1, ?2)",
            (batch.rule_id, batch.created_at),
        )?;

        let id = self.connection.last_insert_rowid();

        let mut statement = self.connection.prepare(
            "INSERT INTO batch_change (batch_id, position, transaction_id, previous_category, new_category)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        for (position, change) in (0_i64..).zip(&batch.changes) {
            statement.execute((
                id,
                position,
                change.transaction_id,
                &change.previous_category,
                &change.new_category,
            ))?;
        }

        Ok(batch.finalise(id))
    }

    /// Retrieve a batch and its changes, in the order they were made.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::BatchNotFound] if `id` does not refer to a batch,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn get_batch(&self, id: BatchId) -> Result<Batch, Error> {
        let (rule_id, created_at, undone_at) = self
            .connection
            .query_row(
                "SELECT rule_id, created_at, undone_at FROM batch WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::BatchNotFound(id),
                error => error.into(),
            })?;

        let changes = self
            .connection
            .prepare(
                "SELECT transaction_id, previous_category, new_category
                 FROM batch_change WHERE batch_id = ?1 ORDER BY position ASC",
            )?
            .query_map([id], BatchChange::map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Batch {
            id,
            rule_id,
            created_at,
            undone_at,
            changes,
        })
    }

    /// Set `undone_at` on an active batch.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::BatchNotFound] if `id` does not refer to a batch,
    /// - [Error::AlreadyUndone] if the batch has already been undone,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn mark_undone(&mut self, id: BatchId, undone_at: OffsetDateTime) -> Result<(), Error> {
        let rows_affected = self.connection.execute(
            "UPDATE batch SET undone_at = ?1 WHERE id = ?2 AND undone_at IS NULL",
            (undone_at, id),
        )?;

        if rows_affected == 1 {
            return Ok(());
        }

        let exists = self
            .connection
            .query_row("SELECT 1 FROM batch WHERE id = ?1", [id], |_| Ok(()))
            .optional()?
            .is_some();

        if exists {
            Err(Error::AlreadyUndone(id))
        } else {
            Err(Error::BatchNotFound(id))
        }
    }

    /// List batch summaries newest first.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] if there is an SQL error.
    fn list_batches(&self, query: &BatchQuery) -> Result<Vec<BatchSummary>, Error> {
        let mut query_string_parts = vec![
            "SELECT b.id, b.rule_id, b.created_at, b.undone_at, COUNT(c.batch_id)
             FROM batch b LEFT JOIN batch_change c ON c.batch_id = b.id"
                .to_string(),
        ];
        let mut where_clause_parts = vec![];
        let mut query_parameters = vec![];

        if let Some(rule_id) = query.rule_id {
            query_parameters.push(Value::Integer(rule_id));
            where_clause_parts.push(format!("b.rule_id = ?{}", query_parameters.len()));
        }

        if !query.include_undone {
            where_clause_parts.push("b.undone_at IS NULL".to_string());
        }

        if !where_clause_parts.is_empty() {
            query_string_parts.push(String::from("WHERE ") + &where_clause_parts.join(" AND "));
        }

        query_parameters.push(Value::Integer(i64::from(query.limit)));
        query_string_parts.push(format!(
            "GROUP BY b.id ORDER BY b.id DESC LIMIT ?{}",
            query_parameters.len()
        ));

        let query_string = query_string_parts.join(" ");
        let params = params_from_iter(query_parameters.iter());

        self.connection
            .prepare(&query_string)?
            .query_map(params, BatchSummary::map_row)?
            .map(|maybe_summary| maybe_summary.map_err(Error::from))
            .collect()
    }

    fn latest_change_after(
        &self,
        transaction_id: TransactionId,
        batch_id: BatchId,
    ) -> Result<Option<BatchId>, Error> {
        let later_batch = self
            .connection
            .query_row(
                "SELECT b.id FROM batch b
                 INNER JOIN batch_change c ON c.batch_id = b.id
                 WHERE c.transaction_id = ?1 AND b.id > ?2 AND b.undone_at IS NULL
                 ORDER BY b.id DESC LIMIT 1",
                (transaction_id, batch_id),
                |row| row.get(0),
            )
            .optional()?;

        Ok(later_batch)
    }
}

impl CreateTable for Batch {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS batch (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                rule_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                undone_at TEXT
            )",
            (),
        )?;

        // Change rows are immutable once written; undo only sets `batch.undone_at`.
        connection.execute(
            "CREATE TABLE IF NOT EXISTS batch_change (
                batch_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                transaction_id INTEGER NOT NULL,
                previous_category TEXT,
                new_category TEXT NOT NULL,
                PRIMARY KEY(batch_id, position),
                FOREIGN KEY(batch_id) REFERENCES batch(id) ON UPDATE CASCADE ON DELETE CASCADE
            )",
            (),
        )?;

        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_batch_change_transaction ON batch_change(transaction_id)",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for BatchChange {
    type ReturnType = BatchChange;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(BatchChange {
            transaction_id: row.get(offset)?,
            previous_category: row.get(offset + 1)?,
            new_category: row.get(offset + 2)?,
        })
    }
}

impl MapRow for BatchSummary {
    type ReturnType = BatchSummary;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let undone_at: Option<OffsetDateTime> = row.get(offset + 3)?;
        let raw_change_count: i64 = row.get(offset + 4)?;
        let change_count = usize::try_from(raw_change_count).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(offset + 4, Type::Integer, Box::new(error))
        })?;

        Ok(BatchSummary {
            id: row.get(offset)?,
            rule_id: row.get(offset + 1)?,
            created_at: row.get(offset + 2)?,
            undone: undone_at.is_some(),
            undone_at,
            change_count,
        })
    }
}
