//! storage layer for tinygit
//!
//! this module implements the object database: content hashing, the
//! canonical object encodings, and the compressed fan-out store on disk.
//! The upper layers (repository facade, pack decoder, CLI) use this API
//! and never touch the on-disk layout directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ObjectStore                           │
//! │   (put/get of compressed canonical encodings, keyed by id)  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │    tree     │       │   object    │       │   commit    │
//!  │ (dir codec) │       │ (hash+codec)│       │  (history)  │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use tinygit::storage::{ObjectStore, ObjectKind};
//!
//! let store = ObjectStore::init("./project")?;
//! let id = store.put(ObjectKind::Blob, b"hello\n")?;
//! let (kind, payload) = store.get(id)?;
//! ```

mod commit;
mod error;
mod object;
mod store;
mod tree;
mod types;

// Re-export public API
pub use commit::{Commit, CommitBuilder};
pub use error::{StorageError, StorageResult};
pub use object::{decode_object, encode_object, object_id, Object};
pub use store::{ObjectStore, REPO_DIR};
pub use tree::{checkout, decode_entries, encode_entries, write_tree, TreeEntry, TreeWalk, WalkOptions};
pub use types::{EntryMode, Identity, InvalidIdError, ObjectId, ObjectKind};
