//! Storage layer error types
//!
//! All errors that can occur while reading or writing the object
//! database are defined here. We use `thiserror` for ergonomic error
//! definition and better error messages

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::types::{InvalidIdError, ObjectId};

/// the main error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// no object with this id exists in the store
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// the stored bytes could not be decompressed or their header
    /// could not be parsed back into a kind and length
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// a tree payload is structurally invalid
    #[error("malformed tree: {0}")]
    MalformedTree(String),

    /// a commit payload is structurally invalid
    #[error("malformed commit: {0}")]
    MalformedCommit(String),

    /// checkout referenced an object that is absent from the store
    #[error("missing object during checkout: {0}")]
    MissingObject(ObjectId),

    /// an object id string was not 40 hex characters
    #[error("invalid object id: {0}")]
    InvalidId(#[from] InvalidIdError),

    /// the repository metadata directory does not exist
    #[error("repository not initialized: {0}")]
    NotInitialized(PathBuf),

    /// I/O error (filesystem level)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// check if this error indicates the object doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::ObjectNotFound(_) | StorageError::MissingObject(_)
        )
    }
}

/// result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
