//! Engine-agnostic core of the docsql document store.
//!
//! docsql stores schema-less JSON documents in a relational engine and
//! answers filtered queries through a per-property secondary index. This
//! crate holds everything that does not depend on a concrete engine: the
//! document model, the filter language and its SQL compiler, the statement
//! templates, and the collection lifecycle. Engines plug in through the
//! [`Engine`] trait; see the `docsql-sqlite` crate for the SQLite one.

pub mod collection;
pub mod connector;
pub mod document;
pub mod engine;
pub mod error;
pub mod filter;
pub mod profile;
pub mod statement;
pub mod store;

pub use collection::{Collection, CollectionOptions, FindResult};
pub use connector::Connector;
pub use document::Document;
pub use engine::{Engine, EngineBuilder, Row};
pub use error::{DocSqlError, DocSqlResult};
pub use filter::{Comparison, Filter, IndexType, LogicOp};
pub use profile::{Profiler, StatementLog, StatementRecord};
pub use store::DocStore;
