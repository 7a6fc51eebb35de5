//! Main docsql crate providing a unified interface for schema-less JSON
//! document storage over a relational engine.
//!
//! This crate is the primary entry point for users of docsql. It re-exports
//! the core types from the sub-crates and provides convenient access to the
//! bundled SQLite engine.
//!
//! # Features
//!
//! - **Schema-less documents** - Store any JSON object; no upfront schema
//! - **Secondary indexes** - Scalar payload properties are indexed on every
//!   write and queried through plain SQL joins
//! - **Two query styles** - A fluent filter builder, or JSON query text
//!   parsed at runtime
//! - **Pluggable engines** - Anything relational behind the `Engine` trait;
//!   SQLite ships in the box
//!
//! # Quick Start
//!
//! ```ignore
//! use docsql::{prelude::*, sqlite::SqliteEngine};
//! use serde_json::json;
//!
//! let store = DocStore::new(SqliteEngine::open("app.db")?);
//! let people = store.collection("people").await?;
//!
//! let alice = people.insert(json!({ "name": "alice", "age": 34 })).await?;
//!
//! let mut adults = Filter::new();
//! adults.where_("age").gt_eq(18).order_by("name").reverse(false);
//! for person in people.find(&adults).await? {
//!     println!("{} ({})", person.get("name").unwrap(), person.id());
//! }
//!
//! // Or the same filter as query text, e.g. straight from an HTTP request.
//! let adults = Filter::parse(r#"{"age": ">= 18", "order": "name", "reverse": false}"#)?;
//! let total = people.count(Some(&adults)).await?;
//! ```
//!
//! # Engines
//!
//! - [`sqlite`] - The bundled SQLite engine, file-backed or in-memory

pub mod prelude;

pub use docsql_core::{
    collection, connector, document, engine, error, filter, profile, statement, store,
};

// Re-export serde_json; every payload and filter comparand goes through it.
pub use serde_json;

/// SQLite engine implementations.
pub mod sqlite {
    pub use docsql_sqlite::{SqliteEngine, SqliteEngineBuilder};
}
