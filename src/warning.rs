use serde::{Serialize, Serializer};
use std::fmt;

/// Non-fatal conditions met during a release run.
/// They never change the outcome status but are reported to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseWarning {
    /// Refreshing refs from the remote failed; versions may be stale
    FetchFailed { remote: String, reason: String },
    /// Production carries no detectable version
    ProductionVersionMissing { branch: String },
    /// Tracker sync fell back to a placeholder or a stale record
    TrackerDegraded { ticket: String, reason: String },
    /// Release branch already existed and was reused
    BranchReused { branch: String },
    /// Notes were unchanged so no commit was made
    CommitSkipped { branch: String },
    /// Release tag already existed and was left untouched
    TagAlreadyExists { tag: String },
}

impl fmt::Display for ReleaseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseWarning::FetchFailed { remote, reason } => {
                write!(f, "Could not fetch from remote '{}': {}", remote, reason)
            }
            ReleaseWarning::ProductionVersionMissing { branch } => {
                write!(f, "No version detected on production branch '{}'", branch)
            }
            ReleaseWarning::TrackerDegraded { ticket, reason } => {
                write!(f, "Tracker sync for '{}' incomplete: {}", ticket, reason)
            }
            ReleaseWarning::BranchReused { branch } => {
                write!(f, "Release branch '{}' already exists, reusing it", branch)
            }
            ReleaseWarning::CommitSkipped { branch } => {
                write!(f, "Release notes on '{}' unchanged, no commit made", branch)
            }
            ReleaseWarning::TagAlreadyExists { tag } => {
                write!(f, "Tag '{}' already exists, leaving it in place", tag)
            }
        }
    }
}

// Warnings are reported as their display text
impl Serialize for ReleaseWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
