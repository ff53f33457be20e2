//! core type-safe primitives for the storage layer.

use std::fmt;

/// number of raw bytes in an object id
pub const ID_BYTES: usize = 20;

/// A 20-byte content digest identifying one object.
///
/// Rendered externally as 40 lowercase hex characters. Two objects with
/// identical canonical encodings always share an id; the store never
/// holds two different byte sequences under one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; ID_BYTES]);

impl ObjectId {
    /// wrap raw digest bytes
    pub fn from_bytes(bytes: [u8; ID_BYTES]) -> Self {
        Self(bytes)
    }

    /// parse an id from a 40-character lowercase hex string
    pub fn from_hex(hex: &str) -> Result<Self, InvalidIdError> {
        let hex = hex.as_bytes();
        if hex.len() != ID_BYTES * 2 {
            return Err(InvalidIdError::Length(hex.len()));
        }

        let mut bytes = [0u8; ID_BYTES];
        for (i, pair) in hex.chunks_exact(2).enumerate() {
            let hi = hex_value(pair[0]).ok_or(InvalidIdError::Character(pair[0] as char))?;
            let lo = hex_value(pair[1]).ok_or(InvalidIdError::Character(pair[1] as char))?;
            bytes[i] = hi << 4 | lo;
        }
        Ok(Self(bytes))
    }

    /// parse an id from a 20-byte raw slice (as embedded in tree payloads)
    pub fn from_raw(slice: &[u8]) -> Result<Self, InvalidIdError> {
        let bytes =
            <[u8; ID_BYTES]>::try_from(slice).map_err(|_| InvalidIdError::Length(slice.len()))?;
        Ok(Self(bytes))
    }

    /// raw digest bytes
    pub fn as_bytes(&self) -> &[u8; ID_BYTES] {
        &self.0
    }

    /// short form of the id (first 7 hex characters)
    pub fn short(&self) -> String {
        self.to_string()[..7].to_string()
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// error type for object id strings that fail to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidIdError {
    Length(usize),
    Character(char),
}

impl fmt::Display for InvalidIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length(len) => write!(f, "expected 40 hex characters, got {}", len),
            Self::Character(c) => write!(f, "invalid hex character '{}'", c),
        }
    }
}

impl std::error::Error for InvalidIdError {}

/// the three object kinds the store understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    /// the kind tag as it appears in the canonical object header
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }

    /// parse a kind tag from a canonical header
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"blob" => Some(ObjectKind::Blob),
            b"tree" => Some(ObjectKind::Tree),
            b"commit" => Some(ObjectKind::Commit),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// file mode of a tree entry, kept as its raw octal text
///
/// The mode bytes are preserved exactly as they appear in the payload,
/// so decoding and re-encoding a tree reproduces its bytes (and
/// therefore its digest). The entry kind is inferred from the value:
/// `40000` means a subtree, everything else is a blob. The name field
/// never embeds a type tag, so names containing spaces parse
/// unambiguously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMode(String);

impl EntryMode {
    /// mode for a regular file written by tree assembly
    pub fn regular() -> Self {
        Self("100644".to_string())
    }

    /// mode for a directory written by tree assembly
    pub fn directory() -> Self {
        Self("40000".to_string())
    }

    /// the mode string as encoded in a tree payload
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// parse a mode field from a tree payload
    ///
    /// any non-empty run of octal digits is a valid mode; unfamiliar
    /// values (executables, symlinks, gitlinks) are carried through
    /// verbatim rather than rejected or normalized.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || !bytes.iter().all(|b| (b'0'..=b'7').contains(b)) {
            return None;
        }
        String::from_utf8(bytes.to_vec()).ok().map(Self)
    }

    /// the object kind this mode points at
    pub fn kind(&self) -> ObjectKind {
        match self.0.as_str() {
            "40000" | "040000" => ObjectKind::Tree,
            _ => ObjectKind::Blob,
        }
    }

    /// whether this mode names a subtree
    pub fn is_tree(&self) -> bool {
        self.kind() == ObjectKind::Tree
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// author/committer identity for new commits
///
/// Threaded explicitly into [`CommitBuilder`](crate::storage::CommitBuilder)
/// so tests can supply deterministic fixtures instead of reading a
/// process-wide constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    /// fixed timezone offset, e.g. "+0000"
    pub tz_offset: String,
}

impl Identity {
    /// create a new identity
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        tz_offset: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            tz_offset: tz_offset.into(),
        }
    }

    /// default identity for tinygit operations
    pub fn tinygit() -> Self {
        Self::new("tinygit", "tinygit@localhost", "+0000")
    }

    /// format as an identity line value: `name <email> epoch offset`
    pub fn format_line(&self, epoch: i64) -> String {
        format!("{} <{}> {} {}", self.name, self.email, epoch, self.tz_offset)
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::tinygit()
    }
}
