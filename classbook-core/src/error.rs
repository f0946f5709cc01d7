//! Error types and result types for validation, translation and store operations.
//!
//! Two layers of errors exist:
//!
//! - [`QueryError`] - local validation failures raised before any backend is touched
//! - [`StoreError`] - everything a data service call can fail with, including wrapped
//!   [`QueryError`]s
//!
//! Use [`StoreResult<T>`] as the return type for fallible store operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::schema::FieldType;

/// A validation or translation failure for a single request payload.
///
/// Every variant is a client error: it is deterministic for a given input and
/// is never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The payload contains keys the target schema does not declare.
    #[error("Unknown fields {unknown:?}, you can only use these fields: {allowed:?}")]
    UnknownField {
        /// The offending keys, sorted.
        unknown: Vec<String>,
        /// Every field name the schema declares, in declaration order.
        allowed: Vec<String>,
    },
    /// A present value could not be coerced to its declared type.
    #[error("Field '{field}' expected {expected}: {reason}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        reason: String,
    },
    /// A required field is missing from a complete document.
    #[error("Field '{0}' is required")]
    MissingField(String),
    /// A coerced value breaks a declared value rule.
    #[error("Field '{field}' is invalid: {reason}")]
    ConstraintViolation { field: String, reason: String },
    /// A reference field holds something that is not a valid store id.
    #[error("Field '{field}' holds an invalid reference: {value}")]
    InvalidReference { field: String, value: String },
    /// An entity tag that names no known schema.
    #[error("Unknown entity kind: {0}")]
    UnknownEntity(String),
}

/// Represents all possible errors that can occur when serving a request through a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The document has an invalid structure for the requested operation.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// No document in the collection matched the search.
    #[error("Item not found in collection {0}")]
    NotFound(String),
    /// Documents matched the search but already held the requested values.
    #[error("Collection {0} was already up to date")]
    AlreadyUpToDate(String),
    /// A delete matched nothing.
    #[error("Deletion failed in collection {0}")]
    DeletionFailed(String),
    /// The request payload failed validation or translation.
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl StoreError {
    /// The HTTP status a request handler should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Query(_) => 422,
            StoreError::NotFound(_) => 404,
            StoreError::AlreadyUpToDate(_) => 200,
            StoreError::DeletionFailed(_) => 410,
            StoreError::InvalidDocument(_) => 400,
            StoreError::Serialization(_)
            | StoreError::Initialization(_)
            | StoreError::Backend(_) => 500,
        }
    }

    /// Whether the failure was caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// A specialized `Result` type for validation and translation.
pub type QueryResult<T> = Result<T, QueryError>;

/// A specialized `Result` type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<BsonError> for StoreError {
    fn from(err: BsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for StoreError {
    fn from(err: SerdeJsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
