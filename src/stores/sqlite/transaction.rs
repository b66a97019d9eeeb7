//! Implements a SQLite backed transaction store.

use std::str::FromStr;

use rusqlite::{Connection, Row, params_from_iter, types::Type, types::Value};
use rust_decimal::Decimal;

use crate::{
    Error,
    category::CategoryName,
    database_id::TransactionId,
    db::{CreateTable, MapRow},
    stores::{TransactionQuery, TransactionStore, sqlite::SQLiteStore},
    transaction::{Transaction, TransactionBuilder},
};

impl TransactionStore for SQLiteStore<'_> {
    /// Create a new transaction in the database.
    ///
    /// Amounts are stored as text so they keep their exact decimal value.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is an SQL error.
    fn create_transaction(&mut self, builder: TransactionBuilder) -> Result<Transaction, Error> {
        let transaction = self
            .connection
            .prepare(
                "INSERT INTO \"transaction\" (date, amount, merchant, description, account, category)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING id, date, amount, merchant, description, account, category",
            )?
            .query_row(
                (
                    builder.date,
                    builder.amount.to_string(),
                    builder.merchant,
                    builder.description,
                    builder.account,
                    builder.category,
                ),
                Transaction::map_row,
            )?;

        Ok(transaction)
    }

    /// Retrieve a transaction in the database by its `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::TransactionNotFound] if `id` does not refer to a valid transaction,
    /// - or [Error::SqlError] there is some other SQL error.
    fn get_transaction(&self, id: TransactionId) -> Result<Transaction, Error> {
        self.connection
            .prepare(
                "SELECT id, date, amount, merchant, description, account, category
                 FROM \"transaction\" WHERE id = :id",
            )?
            .query_row(&[(":id", &id)], Transaction::map_row)
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::TransactionNotFound(id),
                error => error.into(),
            })
    }

    /// Query for transactions in the database, ordered by date and then ID.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] there is a SQL error.
    fn query_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, Error> {
        let mut query_string_parts = vec![
            "SELECT id, date, amount, merchant, description, account, category FROM \"transaction\""
                .to_string(),
        ];
        let mut query_parameters = vec![];

        if let Some(date_range) = query.date_range {
            query_string_parts.push("WHERE date BETWEEN ?1 AND ?2".to_string());
            query_parameters.push(Value::Text(date_range.start().to_string()));
            query_parameters.push(Value::Text(date_range.end().to_string()));
        }

        query_string_parts.push("ORDER BY date ASC, id ASC".to_string());

        let query_string = query_string_parts.join(" ");
        let params = params_from_iter(query_parameters.iter());

        self.connection
            .prepare(&query_string)?
            .query_map(params, Transaction::map_row)?
            .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
            .collect()
    }

    /// Set the category of a transaction and return the category it replaced.
    ///
    /// The read and the write run on the same connection, so when the store
    /// wraps a SQLite transaction they are one critical section.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::TransactionNotFound] if `id` does not refer to a valid transaction,
    /// - or [Error::SqlError] there is some other SQL error.
    fn set_category(
        &mut self,
        id: TransactionId,
        category: Option<&CategoryName>,
    ) -> Result<Option<CategoryName>, Error> {
        let previous_category = self
            .connection
            .query_row(
                "SELECT category FROM \"transaction\" WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::TransactionNotFound(id),
                error => error.into(),
            })?;

        let rows_affected = self.connection.execute(
            "UPDATE \"transaction\" SET category = ?1 WHERE id = ?2",
            (category, id),
        )?;

        if rows_affected != 1 {
            return Err(Error::TransactionNotFound(id));
        }

        Ok(previous_category)
    }
}

impl CreateTable for Transaction {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                amount TEXT NOT NULL,
                merchant TEXT,
                description TEXT,
                account TEXT,
                category TEXT
            )",
            (),
        )?;

        // Previews and applies filter by date range.
        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date)",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for Transaction {
    type ReturnType = Transaction;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let id = row.get(offset)?;
        let date = row.get(offset + 1)?;
        let raw_amount: String = row.get(offset + 2)?;
        let amount = Decimal::from_str(&raw_amount).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(offset + 2, Type::Text, Box::new(error))
        })?;
        let merchant = row.get(offset + 3)?;
        let description = row.get(offset + 4)?;
        let account = row.get(offset + 5)?;
        let category = row.get(offset + 6)?;

        Ok(Transaction {
            id,
            date,
            amount,
            merchant,
            description,
            account,
            category,
        })
    }
}
