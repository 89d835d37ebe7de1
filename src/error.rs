use std::fmt;

use thiserror::Error;

/// Failure to parse a version string into a [`crate::domain::SemanticVersion`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Version string is empty")]
    Empty,

    #[error("Invalid version format: '{0}' - expected X.Y.Z")]
    Malformed(String),

    #[error("Invalid {component} version component: '{value}'")]
    Component {
        component: &'static str,
        value: String,
    },
}

/// Why a single manifest candidate did not yield a version.
///
/// These are soft: the reader logs them and moves on to the next candidate.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest '{path}' not found at '{rev}'")]
    NotFound { rev: String, path: String },

    #[error("Manifest '{path}' could not be parsed: {reason}")]
    Parse { path: String, reason: String },

    #[error("Manifest '{path}' has no version field")]
    MissingVersion { path: String },

    #[error("Manifest '{path}' has an unsupported format")]
    UnsupportedFormat { path: String },

    #[error("Could not read manifest '{path}': {source}")]
    Backend {
        path: String,
        #[source]
        source: VcsError,
    },
}

/// Errors raised by a version-control backend
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reference not found: {0}")]
    RefNotFound(String),

    #[error("Branch already exists: {0}")]
    BranchExists(String),

    #[error("Tag already exists: {0}")]
    TagExists(String),

    #[error("Nothing to commit")]
    NothingToCommit,

    #[error("Repository has no working directory")]
    BareRepository,

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("{0}")]
    Backend(String),
}

impl VcsError {
    pub fn remote(msg: impl Into<String>) -> Self {
        VcsError::Remote(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        VcsError::Backend(msg.into())
    }
}

/// Errors from the issue tracker. Always soft at the workflow level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Tracker unavailable: {0}")]
    Transport(String),

    #[error("Tracker returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Tracker response could not be parsed: {0}")]
    Parse(String),

    #[error("Tracker credentials are missing: {0}")]
    MissingCredentials(&'static str),

    #[error("Tracker issue is missing field '{0}'")]
    MissingField(&'static str),
}

impl TrackerError {
    /// Whether another host might succeed where this one failed
    pub fn is_transport(&self) -> bool {
        matches!(self, TrackerError::Transport(_))
    }
}

/// One step of the release mutation sequence, used to name failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStep {
    CheckoutSource,
    EnsureBranch,
    WriteNotes,
    Commit,
    EnsureTag,
    Push,
}

impl ReleaseStep {
    pub fn name(&self) -> &'static str {
        match self {
            ReleaseStep::CheckoutSource => "checkout-source",
            ReleaseStep::EnsureBranch => "ensure-branch",
            ReleaseStep::WriteNotes => "write-notes",
            ReleaseStep::Commit => "commit",
            ReleaseStep::EnsureTag => "ensure-tag",
            ReleaseStep::Push => "push",
        }
    }
}

impl fmt::Display for ReleaseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unified error type for git-promote operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Release step '{step}' failed: {source}")]
    Step {
        step: ReleaseStep,
        #[source]
        source: VcsError,
    },

    #[error("Push of '{branch}' failed, local branch and tag may be ahead of the remote: {source}")]
    Push {
        branch: String,
        #[source]
        source: VcsError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-promote
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Wrap a backend failure with the step that raised it
    pub fn step(step: ReleaseStep, source: VcsError) -> Self {
        ReleaseError::Step { step, source }
    }

    /// Wrap a push failure for the given release branch
    pub fn push(branch: impl Into<String>, source: VcsError) -> Self {
        ReleaseError::Push {
            branch: branch.into(),
            source,
        }
    }

    /// The step that failed, if this error came from the mutation sequence
    pub fn failed_step(&self) -> Option<ReleaseStep> {
        match self {
            ReleaseError::Step { step, .. } => Some(*step),
            ReleaseError::Push { .. } => Some(ReleaseStep::Push),
            _ => None,
        }
    }

    pub fn is_push_failure(&self) -> bool {
        matches!(self, ReleaseError::Push { .. })
    }
}
