//! Error types for the document store.

use sentio_core::error::SentioError;

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("unsupported filter on field '{0}'")]
    InvalidFilter(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<StorageError> for SentioError {
    fn from(err: StorageError) -> Self {
        SentioError::Storage(err.to_string())
    }
}
