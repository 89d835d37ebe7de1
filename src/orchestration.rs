//! Release workflow orchestration
//!
//! Ties the pieces together for one run: refresh refs, read both versions,
//! decide, reconcile the tracker, then execute. Every path ends in a
//! [ReleaseOutcome]; nothing is raised past this boundary.

use crate::config::Config;
use crate::domain::{InvalidReason, NoChangeReason, ReleaseDecision, ReleaseIdentifier, TicketExtractor};
use crate::error::ReleaseStep;
use crate::executor::{ExecutionReport, ReleaseExecutor};
use crate::git::VersionControl;
use crate::manifest::ManifestReader;
use crate::notes::render_release_notes;
use crate::planner::ReleasePlanner;
use crate::tracker::{IssueRecord, IssueTrackerClient};
use crate::warning::ReleaseWarning;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

/// Input for one release run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    /// Branch carrying the candidate version
    pub source_branch: String,

    /// Ticket key that bypasses extraction from the branch name
    pub ticket: Option<String>,

    /// Decide and report without touching the tracker or the repository
    pub dry_run: bool,
}

impl ReleaseRequest {
    pub fn new(source_branch: impl Into<String>) -> Self {
        ReleaseRequest {
            source_branch: source_branch.into(),
            ticket: None,
            dry_run: false,
        }
    }

    pub fn with_ticket(mut self, ticket: Option<String>) -> Self {
        self.ticket = ticket.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    NoChange,
    Invalid,
    Error,
}

/// Structured result of a run
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseOutcome {
    pub status: OutcomeStatus,
    /// Human-readable status line
    pub message: String,
    pub source_branch: String,
    /// Version detected on the source branch
    pub version: Option<String>,
    pub production_version: Option<String>,
    pub ticket: Option<String>,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub issue: Option<IssueRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<ReleaseStep>,
    /// Local release refs may be ahead of the remote
    pub push_failed: bool,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionReport>,
    pub warnings: Vec<ReleaseWarning>,
}

impl ReleaseOutcome {
    fn pending(request: &ReleaseRequest) -> Self {
        ReleaseOutcome {
            status: OutcomeStatus::Error,
            message: String::new(),
            source_branch: request.source_branch.clone(),
            version: None,
            production_version: None,
            ticket: None,
            branch: None,
            tag: None,
            issue: None,
            failed_step: None,
            push_failed: false,
            dry_run: request.dry_run,
            execution: None,
            warnings: Vec::new(),
        }
    }

    /// An error outcome for failures before the workflow could start
    pub fn failed(request: &ReleaseRequest, message: impl Into<String>) -> Self {
        ReleaseOutcome {
            message: message.into(),
            ..ReleaseOutcome::pending(request)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// Process exit code: 0 success/no change, 2 invalid, 1 error
    pub fn exit_code(&self) -> i32 {
        match self.status {
            OutcomeStatus::Success | OutcomeStatus::NoChange => 0,
            OutcomeStatus::Invalid => 2,
            OutcomeStatus::Error => 1,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs the release workflow against one repository backend
pub struct Orchestrator<B: VersionControl> {
    config: Config,
    backend: B,
    tracker: Option<IssueTrackerClient>,
    date: Option<NaiveDate>,
}

impl<B: VersionControl> Orchestrator<B> {
    pub fn new(config: Config, backend: B) -> Self {
        Orchestrator {
            config,
            backend,
            tracker: None,
            date: None,
        }
    }

    pub fn with_tracker(mut self, tracker: Option<IssueTrackerClient>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Pin the release date instead of using today's UTC date
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run(&mut self, request: &ReleaseRequest) -> ReleaseOutcome {
        let mut outcome = ReleaseOutcome::pending(request);
        info!(
            source = %request.source_branch,
            production = %self.config.production_branch,
            "starting release run"
        );

        if let Err(e) = self.backend.fetch_all() {
            warn!(remote = %self.config.remote, error = %e, "fetch failed, using local refs");
            outcome.warnings.push(ReleaseWarning::FetchFailed {
                remote: self.config.remote.clone(),
                reason: e.to_string(),
            });
        }

        let reader = ManifestReader::from_config(&self.config.manifest);
        let production = reader.read_version(&self.backend, &self.config.production_branch);
        let source = reader.read_version(&self.backend, &request.source_branch);
        if production.is_none() {
            outcome.warnings.push(ReleaseWarning::ProductionVersionMissing {
                branch: self.config.production_branch.clone(),
            });
        }
        outcome.version = source.clone();
        outcome.production_version = production.clone();

        let planner = ReleasePlanner::new(
            self.config.policy.version_gate,
            TicketExtractor::new(
                self.config.ticket.strategies.clone(),
                self.config.ticket.fallback.clone(),
            ),
        );
        let date = self.date.unwrap_or_else(|| Utc::now().date_naive());
        let decision = planner.plan_on(
            production.as_deref(),
            source.as_deref(),
            &request.source_branch,
            request.ticket.as_deref(),
            date,
        );

        match decision {
            ReleaseDecision::NoChange {
                reason,
                source,
                production,
            } => {
                outcome.status = OutcomeStatus::NoChange;
                outcome.message = match reason {
                    NoChangeReason::Unchanged => format!(
                        "No release needed: '{}' is already at version {}",
                        self.config.production_branch, source
                    ),
                    NoChangeReason::NotAhead => format!(
                        "No release needed: source version {} is not ahead of production version {}",
                        source,
                        production.as_deref().unwrap_or("none")
                    ),
                };
                info!("{}", outcome.message);
                outcome
            }
            ReleaseDecision::InvalidVersion { reason, value } => {
                outcome.status = OutcomeStatus::Invalid;
                outcome.message = match (reason, value) {
                    (InvalidReason::NotSemver, Some(value)) => format!(
                        "Invalid version on '{}': '{}' is {}",
                        request.source_branch, value, reason
                    ),
                    (reason, _) => format!("Invalid version on '{}': {}", request.source_branch, reason),
                };
                warn!("{}", outcome.message);
                outcome
            }
            ReleaseDecision::Proceed(identifier) => self.release(request, identifier, outcome),
        }
    }

    fn release(
        &mut self,
        request: &ReleaseRequest,
        identifier: ReleaseIdentifier,
        mut outcome: ReleaseOutcome,
    ) -> ReleaseOutcome {
        outcome.ticket = Some(identifier.ticket.clone());
        outcome.branch = Some(identifier.branch_name());
        outcome.tag = Some(identifier.tag_name());

        if request.dry_run {
            outcome.status = OutcomeStatus::Success;
            outcome.message = format!(
                "Dry run: would release {} on '{}' tagged '{}'",
                identifier.version,
                identifier.branch_name(),
                identifier.tag_name()
            );
            return outcome;
        }

        if let Some(tracker) = &self.tracker {
            let synced = tracker.reconcile(&identifier.ticket, &identifier.version);
            if let Some(e) = synced.error() {
                outcome.warnings.push(ReleaseWarning::TrackerDegraded {
                    ticket: identifier.ticket.clone(),
                    reason: e.to_string(),
                });
            }
            outcome.issue = Some(synced.into_issue());
        }

        let notes = render_release_notes(&identifier, outcome.issue.as_ref(), &request.source_branch);
        let result = ReleaseExecutor::new(&mut self.backend, &self.config.release).execute(
            &identifier,
            &request.source_branch,
            &notes,
        );

        match result {
            Ok(report) => {
                outcome.warnings.extend(report.warnings());
                outcome.status = OutcomeStatus::Success;
                outcome.message = format!(
                    "Released {} on '{}' tagged '{}'",
                    identifier.version, report.branch, report.tag
                );
                outcome.execution = Some(report);
            }
            Err(e) => {
                error!(error = %e, "release failed");
                outcome.status = OutcomeStatus::Error;
                outcome.failed_step = e.failed_step();
                outcome.push_failed = e.is_push_failure();
                outcome.message = e.to_string();
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockBackend;

    fn backend(prod: &str, source: &str) -> MockBackend {
        let mut backend = MockBackend::new();
        backend.add_remote_branch("main", [("package.json", format!(r#"{{"version":"{}"}}"#, prod))]);
        backend.add_remote_branch(
            "feature/ABC-123-login",
            [("package.json", format!(r#"{{"version":"{}"}}"#, source))],
        );
        backend
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_exit_codes() {
        let request = ReleaseRequest::new("x");
        let mut outcome = ReleaseOutcome::failed(&request, "boom");
        assert_eq!(outcome.exit_code(), 1);
        outcome.status = OutcomeStatus::Invalid;
        assert_eq!(outcome.exit_code(), 2);
        outcome.status = OutcomeStatus::NoChange;
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn test_request_ignores_blank_ticket() {
        let request = ReleaseRequest::new("b").with_ticket(Some("  ".into()));
        assert_eq!(request.ticket, None);
    }

    #[test]
    fn test_dry_run_does_not_mutate() {
        let mut orchestrator =
            Orchestrator::new(Config::default(), backend("1.2.0", "1.3.0")).with_date(date());
        let outcome = orchestrator.run(&ReleaseRequest::new("feature/ABC-123-login").dry_run(true));

        assert!(outcome.is_success());
        assert!(outcome.dry_run);
        assert_eq!(outcome.branch.as_deref(), Some("release/ABC-123-1.3.0-20240501"));
        assert!(orchestrator.backend().commit_messages().is_empty());
        assert!(orchestrator.backend().pushes().is_empty());
    }

    #[test]
    fn test_unchanged_message() {
        let mut orchestrator = Orchestrator::new(Config::default(), backend("1.2.0", "1.2.0"));
        let outcome = orchestrator.run(&ReleaseRequest::new("feature/ABC-123-login"));
        assert_eq!(outcome.status, OutcomeStatus::NoChange);
        assert_eq!(outcome.message, "No release needed: 'main' is already at version 1.2.0");
        assert_eq!(outcome.branch, None);
    }

    #[test]
    fn test_invalid_message_names_value() {
        let mut orchestrator = Orchestrator::new(Config::default(), backend("1.2.0", "1.3"));
        let outcome = orchestrator.run(&ReleaseRequest::new("feature/ABC-123-login"));
        assert_eq!(outcome.status, OutcomeStatus::Invalid);
        assert_eq!(
            outcome.message,
            "Invalid version on 'feature/ABC-123-login': '1.3' is not a valid semantic version"
        );
        assert_eq!(outcome.exit_code(), 2);
    }

    #[test]
    fn test_outcome_json_shape() {
        let mut orchestrator =
            Orchestrator::new(Config::default(), backend("1.2.0", "1.3.0")).with_date(date());
        let outcome = orchestrator.run(&ReleaseRequest::new("feature/ABC-123-login"));
        let json: serde_json::Value = serde_json::from_str(&outcome.to_json().unwrap()).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["version"], "1.3.0");
        assert_eq!(json["ticket"], "ABC-123");
        assert_eq!(json["tag"], "v1.3.0");
        assert_eq!(json["issue"], serde_json::Value::Null);
        assert_eq!(json["execution"]["branch_state"], "created");
    }
}
