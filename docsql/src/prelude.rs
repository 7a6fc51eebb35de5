//! Convenient re-exports of commonly used types from docsql.
//!
//! Import this prelude module to quickly access the most frequently used
//! types without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docsql::prelude::*;
//! ```
//!
//! This provides access to:
//! - The store facade and collection handles
//! - The document type and filter builder
//! - The engine trait for plugging in other relational engines
//! - Error types and the statement profiler hook

pub use docsql_core::{
    collection::{Collection, CollectionOptions, FindResult},
    document::Document,
    engine::{Engine, EngineBuilder, Row},
    error::{DocSqlError, DocSqlResult},
    filter::{Comparison, Filter, IndexType, LogicOp},
    profile::{Profiler, StatementLog, StatementRecord},
    store::DocStore,
};
