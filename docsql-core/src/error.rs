//! Error and result types for document store operations.
//!
//! Use [`DocSqlResult<T>`] as the return type for fallible operations.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with the store.
///
/// Absent data is never an error: a single-id lookup that finds nothing is
/// `Ok(None)` and a filter that matches nothing is `Ok(vec![])`.
#[derive(Error, Debug)]
pub enum DocSqlError {
    /// A filter query text could not be parsed into a filter.
    #[error("invalid filter query text: {0}")]
    FilterParse(String),
    /// The relational engine rejected or failed a statement.
    #[error("engine error: {0}")]
    Engine(String),
    /// A collection was constructed with an invalid name or option.
    #[error("invalid collection configuration: {0}")]
    Configuration(String),
    /// The caller handed the store something that is not a document payload.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    /// Serialization/deserialization error when converting documents to or
    /// from their stored JSON text.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A specialized `Result` type for document store operations.
pub type DocSqlResult<T> = Result<T, DocSqlError>;

impl From<SerdeJsonError> for DocSqlError {
    fn from(err: SerdeJsonError) -> Self {
        DocSqlError::Serialization(err.to_string())
    }
}
