//! Pack decoding error types

use thiserror::Error;

use crate::storage::StorageError;

/// errors surfaced while decoding a pack transfer stream
#[derive(Debug, Error)]
pub enum PackError {
    /// the stream does not start with the 4-byte PACK signature
    #[error("bad pack signature: {0:?}")]
    BadSignature([u8; 4]),

    /// the 4-byte format version is one we do not understand
    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),

    /// an entry carried a type tag that is neither literal nor delta
    #[error("unknown pack entry type: {0}")]
    UnknownType(u8),

    /// the stream ended mid-header or mid-entry
    #[error("truncated pack stream at offset {0}")]
    Truncated(usize),

    /// an entry decompressed to a different length than it declared
    #[error("pack entry size mismatch: declared {declared}, got {actual}")]
    SizeMismatch { declared: u64, actual: usize },

    /// the trailing checksum does not match the stream contents
    #[error("pack checksum mismatch")]
    BadChecksum,

    /// storing a decoded object failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// result type alias for pack operations
pub type PackResult<T> = Result<T, PackError>;
