//! Transfer client error types

use thiserror::Error;

/// errors surfaced by the clone transfer round-trips
#[derive(Debug, Error)]
pub enum TransferError {
    /// the remote could not be reached or returned a failure status
    #[error("transfer failed: {0}")]
    Http(#[from] Box<ureq::Error>),

    /// reading a response body failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// a pkt-line frame in the ref advertisement did not parse
    #[error("malformed ref advertisement: {0}")]
    BadAdvertisement(String),

    /// the advertisement carried no HEAD ref
    #[error("ref advertisement carried no HEAD")]
    MissingHead,

    /// the upload-pack response carried no pack stream
    #[error("response contained no pack stream")]
    MissingPack,
}

/// result type alias for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;
