//! tree operations: directory codec, assembly, walking, checkout.
//!
//! a tree object describes one directory level as a sorted list of
//! (mode, name, id) entries. This module owns:
//! - the binary tree payload codec
//! - `write_tree`: building a tree graph from a working directory
//! - `TreeWalk`: the lazy iterator behind `ls-tree`
//! - `checkout`: materializing a tree graph back onto disk
//!
//! entry order inside a payload is significant for hash stability:
//! assembling the same directory must always reproduce the same id, so
//! entries are sorted by name (byte-wise) before encoding.

use std::fs;
use std::path::Path;
use std::vec::IntoIter;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::store::{ObjectStore, REPO_DIR};
use crate::storage::types::{EntryMode, ObjectId, ObjectKind, ID_BYTES};

/// one (mode, name, id) entry of a tree payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: EntryMode,
    pub name: String,
    pub id: ObjectId,
}

impl TreeEntry {
    /// create a new entry
    pub fn new(mode: EntryMode, name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            id,
        }
    }
}

/// serialize entries to a tree payload: `<mode> <name>\0` + 20 raw bytes
///
/// callers must pass entries already sorted by name ascending
/// (byte-wise, not locale-aware); the codec does not sort internally.
pub fn encode_entries(entries: &[TreeEntry]) -> Vec<u8> {
    let mut payload = Vec::new();
    for entry in entries {
        payload.extend_from_slice(entry.mode.as_str().as_bytes());
        payload.push(b' ');
        payload.extend_from_slice(entry.name.as_bytes());
        payload.push(0);
        payload.extend_from_slice(entry.id.as_bytes());
    }
    payload
}

/// parse a tree payload back into its entries
///
/// scans for alternating `<mode> <name>\0<20 raw bytes>` records and
/// fails with [`StorageError::MalformedTree`] if any delimiter or the
/// raw id is missing before the payload ends.
pub fn decode_entries(payload: &[u8]) -> StorageResult<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let mut rest = payload;

    while !rest.is_empty() {
        let space = rest
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| malformed("missing space after mode"))?;
        let mode = EntryMode::from_bytes(&rest[..space])
            .ok_or_else(|| malformed(format!("unknown mode {:?}", String::from_utf8_lossy(&rest[..space]))))?;
        rest = &rest[space + 1..];

        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| malformed("missing NUL after name"))?;
        let name = std::str::from_utf8(&rest[..nul])
            .map_err(|_| malformed("entry name is not valid utf-8"))?
            .to_string();
        // names come from untrusted payloads and end up joined onto
        // filesystem paths during checkout
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(malformed(format!("illegal entry name {:?}", name)));
        }
        rest = &rest[nul + 1..];

        if rest.len() < ID_BYTES {
            return Err(malformed("truncated entry id"));
        }
        let id = ObjectId::from_raw(&rest[..ID_BYTES]).expect("slice is exactly 20 bytes");
        rest = &rest[ID_BYTES..];

        entries.push(TreeEntry { mode, name, id });
    }

    Ok(entries)
}

fn malformed(reason: impl Into<String>) -> StorageError {
    StorageError::MalformedTree(reason.into())
}

/// Assemble a tree object from a working directory.
///
/// Lists immediate children (excluding the repository metadata
/// directory), stores each regular file as a blob and each subdirectory
/// as a tree, post-order: every descendant is durably stored before the
/// parent tree object is built, so a returned id is always complete.
pub fn write_tree(store: &ObjectStore, dir: &Path) -> StorageResult<ObjectId> {
    let mut entries = Vec::new();

    for child in fs::read_dir(dir)? {
        let child = child?;
        let name = child.file_name().to_string_lossy().into_owned();
        if name == REPO_DIR {
            continue;
        }

        let file_type = child.file_type()?;
        if file_type.is_dir() {
            let id = write_tree(store, &child.path())?;
            entries.push(TreeEntry::new(EntryMode::directory(), name, id));
        } else if file_type.is_file() {
            let contents = fs::read(child.path())?;
            let id = store.put(ObjectKind::Blob, &contents)?;
            entries.push(TreeEntry::new(EntryMode::regular(), name, id));
        }
        // other file types (sockets, fifos) are not representable
    }

    entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    store.put(ObjectKind::Tree, &encode_entries(&entries))
}

/// formatting options for a tree walk
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// descend into subtrees depth-first before the next sibling
    pub recursive: bool,
    /// emit bare names instead of full entry lines
    pub names_only: bool,
}

/// a lazy, finite, non-restartable walk over a tree graph
///
/// yields one formatted line per entry, siblings in stored order. With
/// `recursive` set, a subtree's entries are emitted directly after the
/// subtree's own line and before the next sibling; nested names carry
/// their slash-joined path relative to the walk root. The first error
/// ends the walk.
pub struct TreeWalk<'a> {
    store: &'a ObjectStore,
    options: WalkOptions,
    stack: Vec<Frame>,
    failed: bool,
}

struct Frame {
    entries: IntoIter<TreeEntry>,
    prefix: String,
}

impl<'a> TreeWalk<'a> {
    /// start a walk at the given tree id
    pub fn new(store: &'a ObjectStore, id: ObjectId, options: WalkOptions) -> StorageResult<Self> {
        let entries = load_tree(store, id)?;
        Ok(Self {
            store,
            options,
            stack: vec![Frame {
                entries: entries.into_iter(),
                prefix: String::new(),
            }],
            failed: false,
        })
    }

    fn format_line(&self, entry: &TreeEntry, path: &str) -> String {
        if self.options.names_only {
            path.to_string()
        } else {
            format!(
                "{} {} {}\t{}",
                entry.mode,
                entry.mode.kind(),
                entry.id,
                path
            )
        }
    }
}

impl Iterator for TreeWalk<'_> {
    type Item = StorageResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let frame = self.stack.last_mut()?;
            let entry = match frame.entries.next() {
                Some(entry) => entry,
                None => {
                    self.stack.pop();
                    continue;
                }
            };

            let path = if frame.prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{}/{}", frame.prefix, entry.name)
            };
            let line = self.format_line(&entry, &path);

            if self.options.recursive && entry.mode.is_tree() {
                match load_tree(self.store, entry.id) {
                    Ok(entries) => self.stack.push(Frame {
                        entries: entries.into_iter(),
                        prefix: path,
                    }),
                    Err(e) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                }
            }

            return Some(Ok(line));
        }
    }
}

/// Materialize a tree graph into a target directory (inverse of
/// [`write_tree`]).
///
/// Creates subdirectories and writes file bytes entry by entry. Fails
/// with [`StorageError::MissingObject`] if any referenced id is absent,
/// aborting the remainder; whatever was already written stays on disk
/// (no transactional rollback).
pub fn checkout(store: &ObjectStore, id: ObjectId, target: &Path) -> StorageResult<()> {
    fs::create_dir_all(target)?;

    for entry in load_tree(store, id).map_err(absent_as_missing)? {
        let path = target.join(&entry.name);
        if entry.mode.is_tree() {
            checkout(store, entry.id, &path)?;
        } else {
            let (kind, payload) = store.get(entry.id).map_err(absent_as_missing)?;
            if kind != ObjectKind::Blob {
                return Err(malformed(format!(
                    "entry {} points at a {} object",
                    entry.name, kind
                )));
            }
            fs::write(&path, payload)?;
        }
    }

    Ok(())
}

fn absent_as_missing(e: StorageError) -> StorageError {
    match e {
        StorageError::ObjectNotFound(id) => StorageError::MissingObject(id),
        other => other,
    }
}

/// read and decode one tree object
fn load_tree(store: &ObjectStore, id: ObjectId) -> StorageResult<Vec<TreeEntry>> {
    let (kind, payload) = store.get(id)?;
    if kind != ObjectKind::Tree {
        return Err(malformed(format!("object {} is a {}, expected tree", id, kind)));
    }
    decode_entries(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::object::object_id;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, ObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::init(dir.path()).unwrap();
        (dir, store)
    }

    fn blob_entry(name: &str, contents: &[u8]) -> TreeEntry {
        TreeEntry::new(EntryMode::regular(), name, object_id(ObjectKind::Blob, contents))
    }

    #[test]
    fn test_codec_roundtrip() {
        let entries = vec![
            blob_entry("README.md", b"docs\n"),
            TreeEntry::new(
                EntryMode::directory(),
                "src",
                object_id(ObjectKind::Tree, b""),
            ),
        ];
        let payload = encode_entries(&entries);
        assert_eq!(decode_entries(&payload).unwrap(), entries);
    }

    #[test]
    fn test_codec_name_with_space() {
        // kind is inferred from mode, so spaces in names are unambiguous
        let entries = vec![blob_entry("release notes.txt", b"notes")];
        let payload = encode_entries(&entries);
        let decoded = decode_entries(&payload).unwrap();
        assert_eq!(decoded[0].name, "release notes.txt");
        assert_eq!(decoded[0].mode, EntryMode::regular());
    }

    #[test]
    fn test_decode_rejects_malformed_payloads() {
        // missing NUL after name
        let result = decode_entries(b"100644 file-without-nul");
        assert!(matches!(result, Err(StorageError::MalformedTree(_))));

        // truncated id: NUL present but fewer than 20 bytes follow
        let mut payload = b"100644 file\0".to_vec();
        payload.extend_from_slice(&[0xab; 10]);
        let result = decode_entries(&payload);
        assert!(matches!(result, Err(StorageError::MalformedTree(_))));

        // unknown mode
        let mut payload = b"999999 file\0".to_vec();
        payload.extend_from_slice(&[0xab; 20]);
        let result = decode_entries(&payload);
        assert!(matches!(result, Err(StorageError::MalformedTree(_))));
    }

    #[test]
    fn test_decode_preserves_unfamiliar_modes() {
        // executables, symlinks, and gitlinks decode with their raw
        // mode, so re-encoding reproduces the payload byte for byte
        let blob = object_id(ObjectKind::Blob, b"#!/bin/sh\n");
        let mut payload = b"100755 run.sh\0".to_vec();
        payload.extend_from_slice(blob.as_bytes());
        payload.extend_from_slice(b"160000 vendored\0");
        payload.extend_from_slice(blob.as_bytes());

        let entries = decode_entries(&payload).unwrap();
        assert_eq!(entries[0].mode.as_str(), "100755");
        assert_eq!(entries[0].mode.kind(), ObjectKind::Blob);
        assert_eq!(entries[1].mode.as_str(), "160000");
        assert_eq!(entries[1].mode.kind(), ObjectKind::Blob);

        assert_eq!(encode_entries(&entries), payload);
    }

    #[test]
    fn test_decode_rejects_escaping_names() {
        for name in ["../escape", "nested/slash", "..", "."] {
            let mut payload = format!("100644 {}\0", name).into_bytes();
            payload.extend_from_slice(&[0xab; 20]);
            let result = decode_entries(&payload);
            assert!(
                matches!(result, Err(StorageError::MalformedTree(_))),
                "name {:?} must be rejected",
                name
            );
        }

        // empty name
        let mut payload = b"100644 \0".to_vec();
        payload.extend_from_slice(&[0xab; 20]);
        assert!(matches!(
            decode_entries(&payload),
            Err(StorageError::MalformedTree(_))
        ));
    }

    #[test]
    fn test_canonical_order_gives_one_digest() {
        let a = blob_entry("a.txt", b"a");
        let b = blob_entry("b.txt", b"b");

        let sorted = encode_entries(&[a.clone(), b.clone()]);
        let mut reordered = vec![b, a];
        reordered.sort_by(|x, y| x.name.as_bytes().cmp(y.name.as_bytes()));
        let resorted = encode_entries(&reordered);

        assert_eq!(
            object_id(ObjectKind::Tree, &sorted),
            object_id(ObjectKind::Tree, &resorted)
        );
    }

    #[test]
    fn test_write_tree_skips_metadata_dir() {
        let (dir, store) = setup_store();
        fs::write(dir.path().join("file.txt"), b"contents").unwrap();

        let tree_id = write_tree(&store, dir.path()).unwrap();
        let (_, payload) = store.get(tree_id).unwrap();
        let entries = decode_entries(&payload).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "file.txt");
    }

    #[test]
    fn test_write_tree_is_deterministic() {
        let (dir, store) = setup_store();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.txt"), b"c").unwrap();

        let first = write_tree(&store, dir.path()).unwrap();
        let second = write_tree(&store, dir.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_assemble_checkout_roundtrip() {
        let (dir, store) = setup_store();
        fs::write(dir.path().join("top.txt"), b"top\n").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.txt"), b"deep\n").unwrap();

        let tree_id = write_tree(&store, dir.path()).unwrap();

        let out = TempDir::new().unwrap();
        checkout(&store, tree_id, out.path()).unwrap();

        assert_eq!(fs::read(out.path().join("top.txt")).unwrap(), b"top\n");
        assert_eq!(
            fs::read(out.path().join("nested").join("deep.txt")).unwrap(),
            b"deep\n"
        );

        // re-assembling the checked-out copy yields the same digest
        let out_store = ObjectStore::init(out.path()).unwrap();
        let rebuilt = write_tree(&out_store, out.path()).unwrap();
        assert_eq!(rebuilt, tree_id);
    }

    #[test]
    fn test_checkout_missing_object() {
        let (_dir, store) = setup_store();
        let absent = object_id(ObjectKind::Blob, b"never stored");
        let entries = vec![TreeEntry::new(EntryMode::regular(), "ghost.txt", absent)];
        let tree_id = store
            .put(ObjectKind::Tree, &encode_entries(&entries))
            .unwrap();

        let out = TempDir::new().unwrap();
        let result = checkout(&store, tree_id, out.path());
        assert!(matches!(result, Err(StorageError::MissingObject(_))));
    }

    #[test]
    fn test_walk_single_blob_does_not_recurse() {
        let (_dir, store) = setup_store();
        let blob = store.put(ObjectKind::Blob, b"readme\n").unwrap();
        let entries = vec![TreeEntry::new(EntryMode::regular(), "README.md", blob)];
        let tree_id = store
            .put(ObjectKind::Tree, &encode_entries(&entries))
            .unwrap();

        let options = WalkOptions {
            recursive: true,
            names_only: false,
        };
        let lines: Vec<String> = TreeWalk::new(&store, tree_id, options)
            .unwrap()
            .collect::<StorageResult<_>>()
            .unwrap();

        assert_eq!(lines, vec![format!("100644 blob {}\tREADME.md", blob)]);
    }

    #[test]
    fn test_recursive_walk_emits_subtree_before_sibling() {
        let (_dir, store) = setup_store();
        let inner_blob = store.put(ObjectKind::Blob, b"inner").unwrap();
        let inner = vec![TreeEntry::new(EntryMode::regular(), "inner.txt", inner_blob)];
        let inner_id = store.put(ObjectKind::Tree, &encode_entries(&inner)).unwrap();

        let outer_blob = store.put(ObjectKind::Blob, b"outer").unwrap();
        let outer = vec![
            TreeEntry::new(EntryMode::directory(), "dir", inner_id),
            TreeEntry::new(EntryMode::regular(), "zed.txt", outer_blob),
        ];
        let outer_id = store.put(ObjectKind::Tree, &encode_entries(&outer)).unwrap();

        let options = WalkOptions {
            recursive: true,
            names_only: true,
        };
        let lines: Vec<String> = TreeWalk::new(&store, outer_id, options)
            .unwrap()
            .collect::<StorageResult<_>>()
            .unwrap();

        assert_eq!(lines, vec!["dir", "dir/inner.txt", "zed.txt"]);
    }

    #[test]
    fn test_flat_walk_lists_only_one_level() {
        let (_dir, store) = setup_store();
        let inner_blob = store.put(ObjectKind::Blob, b"inner").unwrap();
        let inner = vec![TreeEntry::new(EntryMode::regular(), "inner.txt", inner_blob)];
        let inner_id = store.put(ObjectKind::Tree, &encode_entries(&inner)).unwrap();

        let outer = vec![TreeEntry::new(EntryMode::directory(), "dir", inner_id)];
        let outer_id = store.put(ObjectKind::Tree, &encode_entries(&outer)).unwrap();

        let lines: Vec<String> = TreeWalk::new(&store, outer_id, WalkOptions::default())
            .unwrap()
            .collect::<StorageResult<_>>()
            .unwrap();

        assert_eq!(lines, vec![format!("40000 tree {}\tdir", inner_id)]);
    }
}
