//! commit objects: the line-oriented payload codec and a builder.
//!
//! a commit payload is a text block:
//!
//! ```text
//! tree <digest-hex>
//! parent <digest-hex>          (optional, at most one)
//! author <name> <email> <epoch-seconds> <±HHMM>
//! committer <name> <email> <epoch-seconds> <±HHMM>
//!
//! <message>
//! ```
//!
//! the builder is a pure encode+store step: it never checks that the
//! referenced tree exists. Integrity is deferred to read time, where
//! the store's `get` validates whatever a commit points at.

use chrono::Utc;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::store::ObjectStore;
use crate::storage::types::{Identity, ObjectId, ObjectKind};

/// a decoded commit object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectId,
    /// at most one parent; merge commits are out of scope
    pub parent: Option<ObjectId>,
    /// identity, epoch and offset, kept as opaque text
    pub author: String,
    /// same shape as `author`
    pub committer: String,
    pub message: String,
}

impl Commit {
    /// serialize to the line-oriented payload
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = String::new();
        payload.push_str(&format!("tree {}\n", self.tree));
        if let Some(parent) = self.parent {
            payload.push_str(&format!("parent {}\n", parent));
        }
        payload.push_str(&format!("author {}\n", self.author));
        payload.push_str(&format!("committer {}\n", self.committer));
        payload.push('\n');
        payload.push_str(&self.message);
        if !self.message.ends_with('\n') {
            payload.push('\n');
        }
        payload.into_bytes()
    }

    /// parse a commit payload
    ///
    /// a missing or unparseable `tree` line is
    /// [`StorageError::MalformedCommit`]; everything else degrades
    /// gracefully (absent identity lines decode to empty strings).
    pub fn decode(payload: &[u8]) -> StorageResult<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| malformed("payload is not valid utf-8"))?;

        let (headers, message) = match text.split_once("\n\n") {
            Some((headers, message)) => (headers, message.to_string()),
            None => (text, String::new()),
        };

        let mut tree = None;
        let mut parent = None;
        let mut author = String::new();
        let mut committer = String::new();

        for line in headers.lines() {
            if let Some(hex) = line.strip_prefix("tree ") {
                let id = ObjectId::from_hex(hex)
                    .map_err(|e| malformed(format!("bad tree id: {}", e)))?;
                tree = Some(id);
            } else if let Some(hex) = line.strip_prefix("parent ") {
                let id = ObjectId::from_hex(hex)
                    .map_err(|e| malformed(format!("bad parent id: {}", e)))?;
                // only the first parent is honored
                if parent.is_none() {
                    parent = Some(id);
                }
            } else if let Some(rest) = line.strip_prefix("author ") {
                author = rest.to_string();
            } else if let Some(rest) = line.strip_prefix("committer ") {
                committer = rest.to_string();
            }
        }

        let tree = tree.ok_or_else(|| malformed("missing tree line"))?;

        Ok(Self {
            tree,
            parent,
            author,
            committer,
            message,
        })
    }

    /// get a short summary of the commit (first line of message)
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }
}

fn malformed(reason: impl Into<String>) -> StorageError {
    StorageError::MalformedCommit(reason.into())
}

/// builder for creating commits with a fluent interface
pub struct CommitBuilder<'a> {
    store: &'a ObjectStore,
    tree: Option<ObjectId>,
    parent: Option<ObjectId>,
    message: String,
    identity: Identity,
    timestamp: Option<i64>,
}

impl<'a> CommitBuilder<'a> {
    /// create a new CommitBuilder
    pub fn new(store: &'a ObjectStore) -> Self {
        Self {
            store,
            tree: None,
            parent: None,
            message: String::new(),
            identity: Identity::tinygit(),
            timestamp: None,
        }
    }

    /// set the tree for this commit
    pub fn tree(mut self, tree: ObjectId) -> Self {
        self.tree = Some(tree);
        self
    }

    /// set the (single) parent commit
    pub fn parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// set the commit message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// set the author/committer identity
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// pin the timestamp instead of using the current time
    ///
    /// tests use this to get byte-identical commits across runs.
    pub fn timestamp(mut self, epoch: i64) -> Self {
        self.timestamp = Some(epoch);
        self
    }

    /// encode and store the commit, returning its id
    pub fn commit(self) -> StorageResult<ObjectId> {
        let tree = self
            .tree
            .ok_or_else(|| malformed("commit requires a tree"))?;

        let epoch = self.timestamp.unwrap_or_else(|| Utc::now().timestamp());
        let identity_line = self.identity.format_line(epoch);

        let commit = Commit {
            tree,
            parent: self.parent,
            author: identity_line.clone(),
            committer: identity_line,
            message: self.message,
        };

        self.store.put(ObjectKind::Commit, &commit.encode())
    }
}
