//! SQLite engine for docsql.
//!
//! Wraps a [`rusqlite::Connection`] behind the [`Engine`] trait. The
//! connection is guarded by an async mutex, which also provides the
//! one-statement-batch-in-flight sequencing the trait requires.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use mea::mutex::Mutex;
use rusqlite::{Connection, types::ValueRef};

use docsql_core::{DocSqlError, DocSqlResult, Engine, EngineBuilder, Row};

/// An [`Engine`] backed by a single SQLite connection.
pub struct SqliteEngine {
    conn: Mutex<Connection>,
}

impl SqliteEngine {
    /// Opens (creating if needed) a database file.
    pub fn open(path: impl AsRef<Path>) -> DocSqlResult<Self> {
        let conn = Connection::open(path).map_err(engine_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DocSqlResult<Self> {
        let conn = Connection::open_in_memory().map_err(engine_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

#[async_trait]
impl Engine for SqliteEngine {
    async fn execute(&self, sql: &str) -> DocSqlResult<u64> {
        let conn = self.conn.lock().await;
        match conn.execute_batch(sql) {
            Ok(()) => Ok(conn.changes()),
            Err(err) => {
                // A batch that dies inside BEGIN..COMMIT leaves the
                // transaction open; close it so the connection stays usable.
                if !conn.is_autocommit() {
                    let _ = conn.execute_batch("ROLLBACK;");
                }
                Err(engine_err(err))
            }
        }
    }

    async fn query(&self, sql: &str) -> DocSqlResult<Vec<Row>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(sql).map_err(engine_err)?;
        let names: Vec<String> =
            stmt.column_names().iter().map(|name| name.to_string()).collect();

        let mut rows = stmt.query([]).map_err(engine_err)?;
        let mut result = Vec::new();
        while let Some(sqlite_row) = rows.next().map_err(engine_err)? {
            let mut row = Row::new();
            for (index, name) in names.iter().enumerate() {
                let cell = match sqlite_row.get_ref(index).map_err(engine_err)? {
                    ValueRef::Null => None,
                    ValueRef::Integer(value) => Some(value.to_string()),
                    ValueRef::Real(value) => Some(value.to_string()),
                    ValueRef::Text(text) => {
                        Some(String::from_utf8_lossy(text).into_owned())
                    }
                    ValueRef::Blob(blob) => {
                        Some(String::from_utf8_lossy(blob).into_owned())
                    }
                };
                row.set(name.clone(), cell);
            }
            result.push(row);
        }
        Ok(result)
    }

    fn quote(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }
}

impl fmt::Debug for SqliteEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteEngine").finish_non_exhaustive()
    }
}

/// Builds a [`SqliteEngine`] from a file path or in memory.
#[derive(Debug, Clone, Default)]
pub struct SqliteEngineBuilder {
    path: Option<PathBuf>,
}

impl SqliteEngineBuilder {
    /// An engine over the database file at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()) }
    }

    /// An engine over a private in-memory database.
    pub fn in_memory() -> Self {
        Self { path: None }
    }
}

#[async_trait]
impl EngineBuilder for SqliteEngineBuilder {
    type Engine = SqliteEngine;

    async fn build(self) -> DocSqlResult<Self::Engine> {
        match self.path {
            Some(path) => SqliteEngine::open(path),
            None => SqliteEngine::open_in_memory(),
        }
    }
}

fn engine_err(err: rusqlite::Error) -> DocSqlError {
    DocSqlError::Engine(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn engine() -> SqliteEngine {
        SqliteEngine::open_in_memory().unwrap()
    }

    #[test]
    fn executes_batches_and_reports_changes() {
        let engine = engine();
        block_on(engine.execute("CREATE TABLE t (a TEXT, b INTEGER);")).unwrap();
        let changed = block_on(engine.execute(
            "INSERT INTO t VALUES ('x', 1);\nINSERT INTO t VALUES ('y', 2);",
        ))
        .unwrap();
        assert_eq!(changed, 1);

        let rows = block_on(engine.query("SELECT a, b FROM t ORDER BY b;")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("a"), Some("x"));
        assert_eq!(rows[1].get("b"), Some("2"));
    }

    #[test]
    fn null_cells_come_back_as_none() {
        let engine = engine();
        block_on(engine.execute("CREATE TABLE t (a TEXT);")).unwrap();
        block_on(engine.execute("INSERT INTO t VALUES (NULL);")).unwrap();
        let rows = block_on(engine.query("SELECT a FROM t;")).unwrap();
        assert_eq!(rows[0].get("a"), None);
    }

    #[test]
    fn quote_escapes_embedded_quotes() {
        let engine = engine();
        assert_eq!(engine.quote("o'brien"), "'o''brien'");
        assert_eq!(engine.quote(""), "''");
    }

    #[test]
    fn failed_statements_surface_as_engine_errors() {
        let engine = engine();
        let result = block_on(engine.execute("NOT SQL;"));
        assert!(matches!(result, Err(DocSqlError::Engine(_))));
    }

    #[test]
    fn failed_transaction_batches_roll_back() {
        let engine = engine();
        block_on(engine.execute("CREATE TABLE t (a TEXT);")).unwrap();
        let result = block_on(engine.execute(
            "BEGIN IMMEDIATE;\nINSERT INTO t VALUES ('x');\nINSERT INTO nope VALUES (1);\nCOMMIT;",
        ));
        assert!(result.is_err());

        // The connection is out of the dead transaction and the partial
        // insert is gone.
        let rows = block_on(engine.query("SELECT COUNT(*) AS total FROM t;")).unwrap();
        assert_eq!(rows[0].get("total"), Some("0"));
        block_on(engine.execute("INSERT INTO t VALUES ('y');")).unwrap();
    }

    #[test]
    fn builder_builds_in_memory_engines() {
        let engine = block_on(SqliteEngineBuilder::in_memory().build()).unwrap();
        block_on(engine.execute("CREATE TABLE t (a);")).unwrap();
    }
}
