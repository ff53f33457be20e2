//! transfer client for populating a store from a remote.
//!
//! this is the boundary component behind `clone`: two blocking HTTP
//! round-trips (ref discovery, upload-pack request) that hand the pack
//! decoder a raw byte stream. All object semantics live elsewhere.

mod client;
mod error;

pub use client::{discover_head, fetch_pack};
pub use error::{TransferError, TransferResult};
