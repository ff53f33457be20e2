//! high-level repository facade.
//!
//! This is the API the command-line layer drives. It owns the object
//! store, the working directory path, and the commit identity, and it
//! wires the storage, pack, and transport layers together for the
//! one multi-component operation (`clone`).

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pack::{self, PackError};
use crate::storage::{
    checkout, decode_object, write_tree, CommitBuilder, Identity, Object, ObjectId, ObjectKind,
    ObjectStore, StorageError, TreeWalk, WalkOptions,
};
use crate::transport::{self, TransferError};

/// errors surfaced at the command boundary
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Pack(#[from] PackError),

    #[error("{0}")]
    Transfer(#[from] TransferError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HEAD (or the ref it points at) does not resolve to a digest
    #[error("HEAD does not resolve to a commit")]
    UnbornHead,

    /// an operation needed a commit but found another kind
    #[error("object {id} is a {found}, expected commit")]
    NotACommit { id: ObjectId, found: ObjectKind },
}

/// result type alias for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// a local repository: working directory plus its object store
pub struct Repository {
    store: ObjectStore,
    workdir: PathBuf,
    identity: Identity,
}

impl Repository {
    /// Initialize a repository in the given working directory.
    pub fn init(workdir: impl AsRef<Path>) -> RepoResult<Self> {
        let workdir = workdir.as_ref().to_path_buf();
        let store = ObjectStore::init(&workdir)?;
        Ok(Self {
            store,
            workdir,
            identity: Identity::tinygit(),
        })
    }

    /// Open an existing repository.
    pub fn open(workdir: impl AsRef<Path>) -> RepoResult<Self> {
        let workdir = workdir.as_ref().to_path_buf();
        let store = ObjectStore::open(&workdir)?;
        Ok(Self {
            store,
            workdir,
            identity: Identity::tinygit(),
        })
    }

    /// set the identity used for new commits
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// the underlying object store
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// the working directory this repository serves
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    // ==================== Object Operations ====================

    /// read the raw payload bytes of one object (`cat-file`)
    pub fn cat_file(&self, id: ObjectId) -> RepoResult<Vec<u8>> {
        let (_, payload) = self.store.get(id)?;
        Ok(payload)
    }

    /// store a file's contents as a blob and return its id (`hash-object`)
    pub fn hash_object(&self, path: impl AsRef<Path>) -> RepoResult<ObjectId> {
        let contents = fs::read(path.as_ref())?;
        Ok(self.store.put(ObjectKind::Blob, &contents)?)
    }

    /// walk a tree's entries as formatted lines (`ls-tree`)
    pub fn ls_tree(
        &self,
        id: ObjectId,
        recursive: bool,
        names_only: bool,
    ) -> RepoResult<TreeWalk<'_>> {
        Ok(TreeWalk::new(
            &self.store,
            id,
            WalkOptions {
                recursive,
                names_only,
            },
        )?)
    }

    // ==================== Tree & Commit Operations ====================

    /// assemble the working directory into a tree object (`write-tree`)
    pub fn write_tree(&self) -> RepoResult<ObjectId> {
        Ok(write_tree(&self.store, &self.workdir)?)
    }

    /// build and store a commit object (`commit-tree`)
    pub fn commit_tree(
        &self,
        tree: ObjectId,
        parent: Option<ObjectId>,
        message: &str,
    ) -> RepoResult<ObjectId> {
        let mut builder = CommitBuilder::new(&self.store)
            .tree(tree)
            .message(message)
            .identity(self.identity.clone());
        if let Some(parent) = parent {
            builder = builder.parent(parent);
        }
        Ok(builder.commit()?)
    }

    // ==================== Refs ====================

    /// resolve HEAD to a commit digest
    ///
    /// follows one level of `ref: refs/heads/...` indirection; a HEAD
    /// whose ref file does not exist yet is [`RepoError::UnbornHead`].
    pub fn head(&self) -> RepoResult<ObjectId> {
        let head = fs::read_to_string(self.store.root().join("HEAD"))?;
        let head = head.trim_end();

        let hex = match head.strip_prefix("ref: ") {
            Some(ref_path) => {
                let ref_file = self.store.root().join(ref_path);
                match fs::read_to_string(&ref_file) {
                    Ok(contents) => contents.trim_end().to_string(),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(RepoError::UnbornHead)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            None => head.to_string(),
        };

        ObjectId::from_hex(&hex).map_err(|_| RepoError::UnbornHead)
    }

    /// point the main branch at a commit
    fn write_main_ref(&self, id: ObjectId) -> RepoResult<()> {
        let ref_file = self.store.root().join("refs").join("heads").join("main");
        fs::write(ref_file, format!("{}\n", id))?;
        Ok(())
    }

    // ==================== Clone ====================

    /// Populate a fresh repository from a remote and materialize its
    /// working tree.
    ///
    /// Transfer client → pack decoder → object store, then the tree
    /// walker checks the HEAD commit's tree out into the target
    /// directory. Returns the repository and the number of objects the
    /// pack decoder stored.
    pub fn clone(url: &str, target: impl AsRef<Path>) -> RepoResult<(Self, usize)> {
        let repo = Self::init(target)?;

        let head = transport::discover_head(url)?;
        let pack = transport::fetch_pack(url, head)?;
        let stored = pack::unpack(&repo.store, &pack)?;

        let (kind, payload) = repo.store.get(head)?;
        let commit = match decode_object(kind, &payload)? {
            Object::Commit(commit) => commit,
            other => {
                return Err(RepoError::NotACommit {
                    id: head,
                    found: other.kind(),
                })
            }
        };

        checkout(&repo.store, commit.tree, &repo.workdir)?;
        repo.write_main_ref(head)?;

        Ok((repo, stored))
    }
}
