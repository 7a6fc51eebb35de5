//! Relational engine boundary.
//!
//! The store consumes its storage engine through exactly three primitives:
//! execute a statement batch, run a query and get rows back, and quote a
//! scalar for embedding in a SQL literal position. Everything else the
//! engine must support (`CREATE TABLE IF NOT EXISTS`, `JOIN`, `GROUP BY`,
//! `ORDER BY`/`LIMIT`/`OFFSET`, multi-statement batches) is plain SQL
//! emitted by the collection engine.
//!
//! Implementations are required to be thread-safe (`Send + Sync`) and to
//! run statements sequentially: one statement batch in flight at a time.

use async_trait::async_trait;
use std::{collections::HashMap, fmt::Debug, sync::Arc};

use crate::error::DocSqlResult;

/// A single result row: column name to cell text.
///
/// The engine hands every cell back as text (`None` for SQL NULL); the
/// collection engine owns any further interpretation. Column-name access is
/// all the core needs, so no positional API is exposed.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: HashMap<String, Option<String>>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a cell, replacing any previous value for the column.
    pub fn set(&mut self, column: impl Into<String>, value: Option<String>) {
        self.columns.insert(column.into(), value);
    }

    /// Returns the cell text for a column, or `None` when the column is
    /// absent or the cell is SQL NULL.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|cell| cell.as_deref())
    }
}

/// Abstract interface to the relational engine.
///
/// # Error Handling
///
/// Operations return [`DocSqlResult<T>`](crate::error::DocSqlResult); any
/// statement the engine rejects surfaces as
/// [`DocSqlError::Engine`](crate::error::DocSqlError::Engine) and is never
/// retried by the core.
#[async_trait]
pub trait Engine: Send + Sync + Debug {
    /// Executes a statement or multi-statement batch, returning the number
    /// of rows affected by the last statement.
    async fn execute(&self, sql: &str) -> DocSqlResult<u64>;

    /// Runs a query and returns the full row set.
    async fn query(&self, sql: &str) -> DocSqlResult<Vec<Row>>;

    /// Quotes a scalar as SQL literal text, including the surrounding
    /// quote characters.
    fn quote(&self, value: &str) -> String;
}

#[async_trait]
impl<E> Engine for &E
where
    E: Engine,
{
    async fn execute(&self, sql: &str) -> DocSqlResult<u64> {
        (*self).execute(sql).await
    }

    async fn query(&self, sql: &str) -> DocSqlResult<Vec<Row>> {
        (*self).query(sql).await
    }

    fn quote(&self, value: &str) -> String {
        (*self).quote(value)
    }
}

#[async_trait]
impl<E> Engine for Arc<E>
where
    E: Engine,
{
    async fn execute(&self, sql: &str) -> DocSqlResult<u64> {
        self.as_ref().execute(sql).await
    }

    async fn query(&self, sql: &str) -> DocSqlResult<Vec<Row>> {
        self.as_ref().query(sql).await
    }

    fn quote(&self, value: &str) -> String {
        self.as_ref().quote(value)
    }
}

/// Factory trait for constructing engine instances.
#[async_trait]
pub trait EngineBuilder {
    type Engine: Engine;

    async fn build(self) -> DocSqlResult<Self::Engine>;
}
