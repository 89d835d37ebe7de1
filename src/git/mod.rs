//! Version-control abstraction layer
//!
//! The release workflow talks to the repository only through the traits in
//! this module, so the same executor runs against a real repository and an
//! in-memory one.
//!
//! - [ContentSource]: read-only access to file content at a ref, used by the
//!   manifest reader.
//! - [VersionControl]: the mutation primitives the release executor composes
//!   into idempotent steps.
//!
//! Implementations:
//!
//! - [repository::Git2Backend]: libgit2 via the `git2` crate
//! - [mock::MockBackend]: in-memory repository for tests and dry runs
//!
//! # Usage
//!
//! ```rust
//! # use git_promote::git::{ContentSource, MockBackend};
//! let mut backend = MockBackend::new();
//! backend.add_remote_branch("main", [("package.json", r#"{"version":"1.0.0"}"#)]);
//! let content = backend.read_file("main", "package.json").unwrap();
//! assert!(content.unwrap().contains("1.0.0"));
//! ```

pub mod mock;
pub mod repository;

pub use mock::{MockBackend, MockOperation};
pub use repository::Git2Backend;

use crate::error::VcsError;

/// Result alias for backend operations
pub type VcsResult<T> = std::result::Result<T, VcsError>;

/// Outcome of a commit request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new commit was written
    Committed { id: String },
    /// The staged tree matched HEAD; nothing was written
    NothingToCommit,
}

/// Read access to repository content at arbitrary refs
pub trait ContentSource {
    /// Read `path` as it exists at `rev`.
    ///
    /// # Returns
    /// * `Ok(Some(content))` - File exists at that ref
    /// * `Ok(None)` - The ref or the file does not exist
    /// * `Err` - The backend itself failed
    fn read_file(&self, rev: &str, path: &str) -> VcsResult<Option<String>>;

    /// Every file path in the tree at `rev`, `/`-separated. Empty when the
    /// ref does not exist.
    fn list_files(&self, rev: &str) -> VcsResult<Vec<String>>;
}

/// Repository mutation primitives.
///
/// A backend is a single mutable resource: one working tree, one HEAD. Every
/// mutating method takes `&mut self`, so a run holds exclusive access for its
/// whole duration.
///
/// Refs passed as `rev` are resolved against the remote-tracking branch first,
/// then the local branch, then as a general rev-spec.
pub trait VersionControl: ContentSource + Send {
    /// Fetch all branches and tags from the configured remote
    fn fetch_all(&mut self) -> VcsResult<()>;

    /// Check out `rev` with a detached HEAD
    fn checkout(&mut self, rev: &str) -> VcsResult<()>;

    /// Whether the remote has a branch named `name`
    fn remote_branch_exists(&self, name: &str) -> VcsResult<bool>;

    /// Fetch one branch from the remote and update the local branch of the
    /// same name, creating it or fast-forwarding it
    fn fetch_branch(&mut self, name: &str) -> VcsResult<()>;

    fn local_branch_exists(&self, name: &str) -> VcsResult<bool>;

    /// Create a local branch at the current HEAD. Fails if it already exists.
    fn create_branch(&mut self, name: &str) -> VcsResult<()>;

    /// Check out an existing local branch
    fn checkout_branch(&mut self, name: &str) -> VcsResult<()>;

    /// Write a file into the working tree, relative to the repository root
    fn write_file(&mut self, path: &str, content: &str) -> VcsResult<()>;

    fn stage_file(&mut self, path: &str) -> VcsResult<()>;

    /// Commit the index on top of HEAD.
    ///
    /// When the index matches HEAD, returns `NothingToCommit` if `allow_noop`
    /// is set and [VcsError::NothingToCommit] otherwise.
    fn commit(&mut self, message: &str, allow_noop: bool) -> VcsResult<CommitOutcome>;

    fn tag_exists(&self, name: &str) -> VcsResult<bool>;

    /// Create an annotated tag at HEAD. Fails if the tag already exists.
    fn create_tag(&mut self, name: &str, message: &str) -> VcsResult<()>;

    /// Push a branch and the given tags to the remote
    fn push(&mut self, branch: &str, tags: &[&str]) -> VcsResult<()>;
}
