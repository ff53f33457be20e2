//! the on-disk object store.
//!
//! objects live under a two-level fan-out keyed by their hex id:
//!
//! ```text
//! .git/
//! ├── objects/
//! │   └── ce/
//! │       └── 013625030ba8dba906f756967f9e9ca394464a
//! ├── refs/
//! │   └── heads/
//! └── HEAD            ("ref: refs/heads/main\n")
//! ```
//!
//! each object file holds the zlib-compressed canonical encoding. The
//! store is append-only: ids are never rewritten or deleted in place,
//! and writing an id that already exists is a no-op.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::object::{self, corrupt};
use crate::storage::types::{ObjectId, ObjectKind};

/// name of the repository metadata directory
pub const REPO_DIR: &str = ".git";

/// contents of a fresh HEAD file
const HEAD_CONTENTS: &str = "ref: refs/heads/main\n";

/// handle to one repository's object database
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Initialize the metadata directory layout and return a store.
    ///
    /// Safe to call on an already-initialized repository; existing
    /// objects and refs are left untouched.
    pub fn init(workdir: impl AsRef<Path>) -> StorageResult<Self> {
        let root = workdir.as_ref().join(REPO_DIR);
        fs::create_dir_all(root.join("objects"))?;
        fs::create_dir_all(root.join("refs").join("heads"))?;

        let head = root.join("HEAD");
        if !head.exists() {
            fs::write(&head, HEAD_CONTENTS)?;
        }

        Ok(Self { root })
    }

    /// Open an existing repository's store.
    pub fn open(workdir: impl AsRef<Path>) -> StorageResult<Self> {
        let root = workdir.as_ref().join(REPO_DIR);
        if !root.join("objects").is_dir() {
            return Err(StorageError::NotInitialized(root));
        }
        Ok(Self { root })
    }

    /// the metadata directory this store is rooted at
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Encode, hash, compress, and persist an object.
    ///
    /// Returns the content id. If the id already exists the write is
    /// skipped; content addressing makes the duplicate byte-identical.
    pub fn put(&self, kind: ObjectKind, payload: &[u8]) -> StorageResult<ObjectId> {
        let encoded = object::encode_object(kind, payload);
        let id = ObjectId::from_bytes(Sha1::digest(&encoded).into());

        let path = self.object_path(id);
        if path.exists() {
            return Ok(id);
        }

        // the fan-out directory may already exist from an earlier write
        fs::create_dir_all(path.parent().expect("object path has a parent"))?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&encoded)?;
        let compressed = encoder.finish()?;
        fs::write(&path, compressed)?;

        Ok(id)
    }

    /// Read an object back as its kind and payload.
    ///
    /// Fails with [`StorageError::ObjectNotFound`] on a miss and with
    /// [`StorageError::CorruptObject`] if decompression fails, the
    /// header does not parse, the declared length disagrees with the
    /// payload, or the bytes no longer hash to the requested id.
    pub fn get(&self, id: ObjectId) -> StorageResult<(ObjectKind, Vec<u8>)> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::ObjectNotFound(id))
            }
            Err(e) => return Err(e.into()),
        };

        let mut decoder = ZlibDecoder::new(compressed.as_slice());
        let mut encoded = Vec::new();
        decoder
            .read_to_end(&mut encoded)
            .map_err(|e| corrupt(id, format!("decompression failed: {}", e)))?;

        let actual = ObjectId::from_bytes(Sha1::digest(&encoded).into());
        if actual != id {
            return Err(corrupt(id, format!("content hashes to {}", actual)));
        }

        let (kind, payload) = object::parse_header(&encoded)
            .ok_or_else(|| corrupt(id, "unparseable header or length mismatch"))?;

        Ok((kind, payload.to_vec()))
    }

    /// check whether an object exists without reading it
    pub fn contains(&self, id: ObjectId) -> bool {
        self.object_path(id).exists()
    }

    /// fan-out path for an id: `objects/<first 2 hex>/<remaining 38>`
    fn object_path(&self, id: ObjectId) -> PathBuf {
        let hex = id.to_string();
        let (dir, file) = hex.split_at(2);
        self.root.join("objects").join(dir).join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, ObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::init(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_init_layout() {
        let (dir, _store) = setup_store();
        let root = dir.path().join(REPO_DIR);
        assert!(root.join("objects").is_dir());
        assert!(root.join("refs").join("heads").is_dir());
        assert_eq!(
            fs::read_to_string(root.join("HEAD")).unwrap(),
            "ref: refs/heads/main\n"
        );
    }

    #[test]
    fn test_open_requires_init() {
        let dir = TempDir::new().unwrap();
        let result = ObjectStore::open(dir.path());
        assert!(matches!(result, Err(StorageError::NotInitialized(_))));

        ObjectStore::init(dir.path()).unwrap();
        assert!(ObjectStore::open(dir.path()).is_ok());
    }

    #[test]
    fn test_put_get_roundtrip() {
        let (_dir, store) = setup_store();
        let id = store.put(ObjectKind::Blob, b"hello\n").unwrap();
        assert_eq!(id.to_string(), "ce013625030ba8dba906f756967f9e9ca394464a");

        let (kind, payload) = store.get(id).unwrap();
        assert_eq!(kind, ObjectKind::Blob);
        assert_eq!(payload, b"hello\n");
    }

    #[test]
    fn test_put_is_idempotent() {
        let (_dir, store) = setup_store();
        let first = store.put(ObjectKind::Blob, b"same").unwrap();
        let second = store.put(ObjectKind::Blob, b"same").unwrap();
        assert_eq!(first, second);
        assert!(store.contains(first));
    }

    #[test]
    fn test_get_missing_object() {
        let (_dir, store) = setup_store();
        let id = ObjectId::from_hex("0123456789abcdef0123456789abcdef01234567").unwrap();
        let result = store.get(id);
        assert!(matches!(result, Err(StorageError::ObjectNotFound(_))));
        assert!(!store.contains(id));
    }

    #[test]
    fn test_get_rejects_garbage_bytes() {
        let (_dir, store) = setup_store();
        let id = store.put(ObjectKind::Blob, b"victim").unwrap();

        // clobber the stored file with bytes that are not a zlib stream
        let path = store.object_path(id);
        fs::write(&path, b"not zlib at all").unwrap();

        let result = store.get(id);
        assert!(matches!(result, Err(StorageError::CorruptObject { .. })));
    }

    #[test]
    fn test_get_rejects_wrong_content() {
        let (_dir, store) = setup_store();
        let victim = store.put(ObjectKind::Blob, b"victim").unwrap();
        let other = store.put(ObjectKind::Blob, b"other").unwrap();

        // swap in another object's file: decompresses fine, wrong hash
        fs::copy(store.object_path(other), store.object_path(victim)).unwrap();

        let result = store.get(victim);
        assert!(matches!(result, Err(StorageError::CorruptObject { .. })));
    }
}
