//! Idempotent release mutation sequence.
//!
//! ```text
//! Idle -> CheckedOutSource -> BranchEnsured -> NotesWritten
//!      -> Committed | CommitSkipped -> TagEnsured -> Pushed -> Done
//! ```
//!
//! Every step checks before it acts, so running the same release twice
//! converges on the same refs: the branch is reused, identical notes produce
//! no commit, and an existing tag is left where it is.

use crate::config::ReleaseConfig;
use crate::domain::ReleaseIdentifier;
use crate::error::{ReleaseError, ReleaseStep, Result};
use crate::git::{CommitOutcome, VersionControl};
use crate::warning::ReleaseWarning;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStage {
    Idle,
    CheckedOutSource,
    BranchEnsured,
    NotesWritten,
    Committed,
    CommitSkipped,
    TagEnsured,
    Pushed,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchState {
    Created,
    /// Existed on the remote or locally from an earlier run
    Reused,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    Committed { id: String },
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagState {
    Created,
    AlreadyPresent,
}

/// What the executor did to reach [ReleaseStage::Done]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub branch: String,
    pub tag: String,
    pub branch_state: BranchState,
    pub commit: CommitState,
    pub tag_state: TagState,
    pub stages: Vec<ReleaseStage>,
}

impl ExecutionReport {
    /// Idempotent short-cuts taken, as user-facing warnings
    pub fn warnings(&self) -> Vec<ReleaseWarning> {
        let mut warnings = Vec::new();
        if self.branch_state == BranchState::Reused {
            warnings.push(ReleaseWarning::BranchReused {
                branch: self.branch.clone(),
            });
        }
        if self.commit == CommitState::Skipped {
            warnings.push(ReleaseWarning::CommitSkipped {
                branch: self.branch.clone(),
            });
        }
        if self.tag_state == TagState::AlreadyPresent {
            warnings.push(ReleaseWarning::TagAlreadyExists {
                tag: self.tag.clone(),
            });
        }
        warnings
    }
}

pub struct ReleaseExecutor<'a, B: VersionControl + ?Sized> {
    backend: &'a mut B,
    settings: &'a ReleaseConfig,
    stages: Vec<ReleaseStage>,
}

impl<'a, B: VersionControl + ?Sized> ReleaseExecutor<'a, B> {
    pub fn new(backend: &'a mut B, settings: &'a ReleaseConfig) -> Self {
        ReleaseExecutor {
            backend,
            settings,
            stages: vec![ReleaseStage::Idle],
        }
    }

    fn advance(&mut self, stage: ReleaseStage) {
        debug!(?stage, "release stage reached");
        self.stages.push(stage);
    }

    /// Run the full sequence for `identifier`, branching from `source_ref`.
    pub fn execute(
        mut self,
        identifier: &ReleaseIdentifier,
        source_ref: &str,
        notes: &str,
    ) -> Result<ExecutionReport> {
        let branch = identifier.branch_name();
        let tag = identifier.tag_name();

        self.backend
            .checkout(source_ref)
            .map_err(|e| ReleaseError::step(ReleaseStep::CheckoutSource, e))?;
        self.advance(ReleaseStage::CheckedOutSource);

        let branch_state = self
            .ensure_branch(&branch)
            .map_err(|e| ReleaseError::step(ReleaseStep::EnsureBranch, e))?;
        info!(branch = %branch, state = ?branch_state, "release branch ready");
        self.advance(ReleaseStage::BranchEnsured);

        let notes_path = self.settings.notes_path.clone();
        self.backend
            .write_file(&notes_path, notes)
            .and_then(|_| self.backend.stage_file(&notes_path))
            .map_err(|e| ReleaseError::step(ReleaseStep::WriteNotes, e))?;
        self.advance(ReleaseStage::NotesWritten);

        let message = identifier.render(&self.settings.commit_message);
        let commit = match self
            .backend
            .commit(&message, true)
            .map_err(|e| ReleaseError::step(ReleaseStep::Commit, e))?
        {
            CommitOutcome::Committed { id } => {
                info!(commit = %id, "release notes committed");
                self.advance(ReleaseStage::Committed);
                CommitState::Committed { id }
            }
            CommitOutcome::NothingToCommit => {
                info!("release notes unchanged, skipping commit");
                self.advance(ReleaseStage::CommitSkipped);
                CommitState::Skipped
            }
        };

        let tag_state = self
            .ensure_tag(identifier, &tag)
            .map_err(|e| ReleaseError::step(ReleaseStep::EnsureTag, e))?;
        info!(tag = %tag, state = ?tag_state, "release tag ready");
        self.advance(ReleaseStage::TagEnsured);

        self.backend
            .push(&branch, &[tag.as_str()])
            .map_err(|e| ReleaseError::push(branch.clone(), e))?;
        info!(branch = %branch, tag = %tag, "pushed release");
        self.advance(ReleaseStage::Pushed);
        self.advance(ReleaseStage::Done);

        Ok(ExecutionReport {
            branch,
            tag,
            branch_state,
            commit,
            tag_state,
            stages: self.stages,
        })
    }

    fn ensure_branch(&mut self, branch: &str) -> crate::git::VcsResult<BranchState> {
        if self.backend.remote_branch_exists(branch)? {
            self.backend.fetch_branch(branch)?;
            self.backend.checkout_branch(branch)?;
            return Ok(BranchState::Reused);
        }
        if self.backend.local_branch_exists(branch)? {
            self.backend.checkout_branch(branch)?;
            return Ok(BranchState::Reused);
        }
        self.backend.create_branch(branch)?;
        self.backend.checkout_branch(branch)?;
        Ok(BranchState::Created)
    }

    fn ensure_tag(
        &mut self,
        identifier: &ReleaseIdentifier,
        tag: &str,
    ) -> crate::git::VcsResult<TagState> {
        if self.backend.tag_exists(tag)? {
            return Ok(TagState::AlreadyPresent);
        }
        let message = identifier.render(&self.settings.tag_message);
        self.backend.create_tag(tag, &message)?;
        Ok(TagState::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{ContentSource, MockBackend, MockOperation};
    use chrono::NaiveDate;

    fn identifier() -> ReleaseIdentifier {
        ReleaseIdentifier::new(
            "ABC-123",
            "1.3.0",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        )
    }

    fn backend() -> MockBackend {
        let mut backend = MockBackend::new();
        backend.add_remote_branch("main", [("package.json", r#"{"version":"1.2.0"}"#)]);
        backend.add_remote_branch(
            "feature/ABC-123-login",
            [("package.json", r#"{"version":"1.3.0"}"#)],
        );
        backend
    }

    fn run(backend: &mut MockBackend, notes: &str) -> Result<ExecutionReport> {
        let settings = ReleaseConfig::default();
        ReleaseExecutor::new(backend, &settings).execute(
            &identifier(),
            "feature/ABC-123-login",
            notes,
        )
    }

    #[test]
    fn test_first_run_creates_everything() {
        let mut backend = backend();
        let report = run(&mut backend, "# Release 1.3.0\n").unwrap();

        assert_eq!(report.branch, "release/ABC-123-1.3.0-20240501");
        assert_eq!(report.branch_state, BranchState::Created);
        assert!(matches!(report.commit, CommitState::Committed { .. }));
        assert_eq!(report.tag_state, TagState::Created);
        assert!(report.warnings().is_empty());
        assert_eq!(
            report.stages,
            vec![
                ReleaseStage::Idle,
                ReleaseStage::CheckedOutSource,
                ReleaseStage::BranchEnsured,
                ReleaseStage::NotesWritten,
                ReleaseStage::Committed,
                ReleaseStage::TagEnsured,
                ReleaseStage::Pushed,
                ReleaseStage::Done,
            ]
        );

        assert_eq!(backend.commit_messages(), ["chore: release 1.3.0"]);
        let pushed = backend.remote_branch(&report.branch).unwrap();
        assert_eq!(pushed.get("RELEASE_NOTES.md").map(String::as_str), Some("# Release 1.3.0\n"));
        assert_eq!(pushed.get("package.json").map(String::as_str), Some(r#"{"version":"1.3.0"}"#));
        assert_eq!(backend.remote_tag("v1.3.0"), Some(pushed));
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let mut backend = backend();
        run(&mut backend, "notes").unwrap();
        let tag_before = backend.remote_tag("v1.3.0").cloned();

        let report = run(&mut backend, "notes").unwrap();
        assert_eq!(report.branch_state, BranchState::Reused);
        assert_eq!(report.commit, CommitState::Skipped);
        assert_eq!(report.tag_state, TagState::AlreadyPresent);
        assert!(report.stages.contains(&ReleaseStage::CommitSkipped));
        assert_eq!(report.warnings().len(), 3);

        assert_eq!(backend.commit_messages().len(), 1);
        assert_eq!(backend.remote_tag("v1.3.0").cloned(), tag_before);
        assert_eq!(backend.pushes().len(), 2);
    }

    #[test]
    fn test_reuses_local_branch_after_failed_push() {
        let mut backend = backend();
        backend.fail_on(MockOperation::Push);
        let err = run(&mut backend, "notes").unwrap_err();
        assert!(err.is_push_failure());
        assert!(backend.remote_branch("release/ABC-123-1.3.0-20240501").is_none());

        backend.clear_failure(MockOperation::Push);
        let report = run(&mut backend, "notes").unwrap();
        assert_eq!(report.branch_state, BranchState::Reused);
        assert_eq!(report.commit, CommitState::Skipped);
        assert_eq!(report.tag_state, TagState::AlreadyPresent);
        assert!(backend.remote_branch(&report.branch).is_some());
    }

    #[test]
    fn test_changed_notes_commit_again() {
        let mut backend = backend();
        run(&mut backend, "first").unwrap();
        let report = run(&mut backend, "second").unwrap();

        assert!(matches!(report.commit, CommitState::Committed { .. }));
        assert_eq!(backend.commit_messages().len(), 2);
        let notes = backend
            .read_file("release/ABC-123-1.3.0-20240501", "RELEASE_NOTES.md")
            .unwrap();
        assert_eq!(notes.as_deref(), Some("second"));
    }

    #[test]
    fn test_failures_name_their_step() {
        let cases = [
            (MockOperation::Checkout, ReleaseStep::CheckoutSource),
            (MockOperation::CreateBranch, ReleaseStep::EnsureBranch),
            (MockOperation::WriteFile, ReleaseStep::WriteNotes),
            (MockOperation::StageFile, ReleaseStep::WriteNotes),
            (MockOperation::Commit, ReleaseStep::Commit),
            (MockOperation::CreateTag, ReleaseStep::EnsureTag),
            (MockOperation::Push, ReleaseStep::Push),
        ];
        for (op, step) in cases {
            let mut backend = backend();
            backend.fail_on(op);
            let err = run(&mut backend, "notes").unwrap_err();
            assert_eq!(err.failed_step(), Some(step), "failing {:?}", op);
        }
    }

    #[test]
    fn test_missing_source_ref() {
        let mut backend = MockBackend::new();
        let settings = ReleaseConfig::default();
        let err = ReleaseExecutor::new(&mut backend, &settings)
            .execute(&identifier(), "feature/gone", "notes")
            .unwrap_err();
        assert_eq!(err.failed_step(), Some(ReleaseStep::CheckoutSource));
    }
}
