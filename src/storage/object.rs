//! canonical object encoding and content hashing.
//!
//! every object is stored and hashed in one canonical form:
//!
//! ```text
//! <kind> <payload-length>\0<payload>
//! ```
//!
//! the id of an object is the SHA-1 of this entire encoding, header
//! included. Hashing is a pure function of the bytes, so identical
//! content always lands on the same id across processes and machines.

use sha1::{Digest, Sha1};

use crate::storage::commit::Commit;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::tree::{self, TreeEntry};
use crate::storage::types::{ObjectId, ObjectKind};

/// a fully decoded object
///
/// closed over the three kinds so every codec site matches exhaustively;
/// there are no stringly-typed kind checks anywhere downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Blob(Vec<u8>),
    Tree(Vec<TreeEntry>),
    Commit(Commit),
}

impl Object {
    /// the kind tag of this object
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Blob(_) => ObjectKind::Blob,
            Object::Tree(_) => ObjectKind::Tree,
            Object::Commit(_) => ObjectKind::Commit,
        }
    }

    /// serialize the payload (the bytes after the canonical header)
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            Object::Blob(bytes) => bytes.clone(),
            Object::Tree(entries) => tree::encode_entries(entries),
            Object::Commit(commit) => commit.encode(),
        }
    }

    /// the content id of this object
    pub fn id(&self) -> ObjectId {
        object_id(self.kind(), &self.encode_payload())
    }
}

/// decode a payload into a structured [`Object`] according to its kind
pub fn decode_object(kind: ObjectKind, payload: &[u8]) -> StorageResult<Object> {
    match kind {
        ObjectKind::Blob => Ok(Object::Blob(payload.to_vec())),
        ObjectKind::Tree => Ok(Object::Tree(tree::decode_entries(payload)?)),
        ObjectKind::Commit => Ok(Object::Commit(Commit::decode(payload)?)),
    }
}

/// build the canonical encoding: `<kind> <len>\0<payload>`
pub fn encode_object(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(payload.len() + 16);
    encoded.extend_from_slice(kind.as_str().as_bytes());
    encoded.push(b' ');
    encoded.extend_from_slice(payload.len().to_string().as_bytes());
    encoded.push(0);
    encoded.extend_from_slice(payload);
    encoded
}

/// compute the id of an object: SHA-1 over the canonical encoding
///
/// pure function, no I/O.
pub fn object_id(kind: ObjectKind, payload: &[u8]) -> ObjectId {
    let mut hasher = Sha1::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(payload.len().to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(payload);
    ObjectId::from_bytes(hasher.finalize().into())
}

/// split a canonical encoding back into its kind and payload
///
/// enforces the declared length exactly: a payload that is shorter or
/// longer than the header claims is corrupt, never truncated or padded.
pub(crate) fn parse_header(encoded: &[u8]) -> Option<(ObjectKind, &[u8])> {
    let space = encoded.iter().position(|&b| b == b' ')?;
    let kind = ObjectKind::from_bytes(&encoded[..space])?;

    let rest = &encoded[space + 1..];
    let nul = rest.iter().position(|&b| b == 0)?;
    let len = parse_decimal(&rest[..nul])?;

    let payload = &rest[nul + 1..];
    if payload.len() != len {
        return None;
    }
    Some((kind, payload))
}

// Parses an ASCII decimal length, rejecting empty input and overflow.
fn parse_decimal(digits: &[u8]) -> Option<usize> {
    if digits.is_empty() {
        return None;
    }
    let mut value = 0usize;
    for &c in digits {
        if !c.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?;
        value = value.checked_add((c - b'0') as usize)?;
    }
    Some(value)
}

/// map a `parse_header` failure into a [`StorageError::CorruptObject`]
pub(crate) fn corrupt(id: ObjectId, reason: impl Into<String>) -> StorageError {
    StorageError::CorruptObject {
        id,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_blob_digest() {
        // matches `git hash-object` on a file containing "hello\n"
        let id = object_id(ObjectKind::Blob, b"hello\n");
        assert_eq!(id.to_string(), "ce013625030ba8dba906f756967f9e9ca394464a");
    }

    #[test]
    fn test_digest_is_stable() {
        let a = object_id(ObjectKind::Blob, b"same bytes");
        let b = object_id(ObjectKind::Blob, b"same bytes");
        assert_eq!(a, b);
    }

    #[test]
    fn test_kind_is_part_of_digest() {
        let blob = object_id(ObjectKind::Blob, b"payload");
        let commit = object_id(ObjectKind::Commit, b"payload");
        assert_ne!(blob, commit);
    }

    #[test]
    fn test_encode_parse_roundtrip() {
        let encoded = encode_object(ObjectKind::Blob, b"hello\n");
        assert_eq!(&encoded[..7], b"blob 6\0");

        let (kind, payload) = parse_header(&encoded).unwrap();
        assert_eq!(kind, ObjectKind::Blob);
        assert_eq!(payload, b"hello\n");
    }

    #[test]
    fn test_digest_matches_encoded_form() {
        let encoded = encode_object(ObjectKind::Blob, b"hello\n");
        let mut hasher = Sha1::new();
        hasher.update(&encoded);
        let direct = ObjectId::from_bytes(hasher.finalize().into());
        assert_eq!(direct, object_id(ObjectKind::Blob, b"hello\n"));
    }

    #[test]
    fn test_parse_header_rejects_bad_input() {
        // unknown kind
        assert!(parse_header(b"tag 3\0abc").is_none());
        // missing NUL
        assert!(parse_header(b"blob 3abc").is_none());
        // declared length disagrees with the payload
        assert!(parse_header(b"blob 4\0abc").is_none());
        assert!(parse_header(b"blob 2\0abc").is_none());
        // non-decimal length
        assert!(parse_header(b"blob x\0abc").is_none());
        // empty input
        assert!(parse_header(b"").is_none());
    }

    #[test]
    fn test_blob_object_roundtrip() {
        let object = decode_object(ObjectKind::Blob, b"contents").unwrap();
        assert_eq!(object.kind(), ObjectKind::Blob);
        assert_eq!(object.encode_payload(), b"contents");
        assert_eq!(object.id(), object_id(ObjectKind::Blob, b"contents"));
    }
}
