use thiserror::Error;

use crate::cache::CacheError;

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{table} not found: {key}")]
    NotFound { table: String, key: String },
    #[error("{table} already exists: {key}")]
    AlreadyExists { table: String, key: String },
    #[error("Concurrency conflict on {table}: {key} no longer exists")]
    Concurrency { table: String, key: String },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for RepositoryError {
    fn from(error: serde_json::Error) -> Self {
        RepositoryError::Serialization(error.to_string())
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
