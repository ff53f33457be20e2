//! tinygit - a minimal content-addressable object store
//!
//! This crate implements the core of a git-compatible repository: the
//! three object kinds (blob, tree, commit), their canonical binary
//! encodings, a compressed on-disk object store addressed by SHA-1, and
//! a decoder for the pack-format transfer stream used by `clone`.
//!
//! # Example
//!
//! ```no_run
//! use tinygit::repo::Repository;
//!
//! let repo = Repository::init(".").unwrap();
//! let id = repo.hash_object("README.md").unwrap();
//! println!("{}", id);
//! ```

pub mod pack;
pub mod repo;
pub mod storage;
pub mod transport;
