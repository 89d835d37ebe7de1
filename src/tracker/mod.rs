//! Issue-tracker reconciliation.
//!
//! For each release the ticket's issue is looked up; an existing issue is
//! moved to done, a missing one is created and closed. The tracker is
//! best-effort: every failure degrades to a placeholder record and is
//! reported alongside it, never raised.

pub mod cloud;
pub mod mock_api;
pub mod transport;

pub use cloud::CloudTracker;
pub use mock_api::MockApiTracker;
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, ScriptedTransport,
};

use crate::config::{TrackerConfig, TrackerMode};
use crate::error::TrackerError;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Where an [IssueRecord] came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueProvenance {
    /// Read from the tracker
    #[default]
    Fetched,
    /// Created by this run
    Created,
    /// Synthesized locally because the tracker could not be reached
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    pub summary: String,
    pub status: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub provenance: IssueProvenance,
}

impl IssueRecord {
    /// Local stand-in used when the tracker is unavailable
    pub fn placeholder(key: &str, version: &str, issue_type: &str) -> Self {
        IssueRecord {
            id: None,
            key: key.to_string(),
            summary: release_summary(key, version),
            status: "Unknown".into(),
            issue_type: issue_type.to_string(),
            provenance: IssueProvenance::Placeholder,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status.eq_ignore_ascii_case(DONE_STATUS)
    }
}

/// Status name of a released issue
pub const DONE_STATUS: &str = "Done";

pub(crate) fn release_summary(key: &str, version: &str) -> String {
    format!("Release {} for {}", version, key)
}

/// One tracker API flavor
pub trait TrackerBackend {
    /// Look up an issue by key; `Ok(None)` when it does not exist
    fn fetch(&self, key: &str) -> Result<Option<IssueRecord>, TrackerError>;

    /// Create the release issue for `key`
    fn create(&self, key: &str, version: &str) -> Result<IssueRecord, TrackerError>;

    /// Move an existing issue to its done state
    fn mark_done(&self, issue: &IssueRecord) -> Result<IssueRecord, TrackerError>;
}

/// Result of a reconciliation. Always carries a record.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerOutcome {
    Synced(IssueRecord),
    Degraded {
        issue: IssueRecord,
        error: TrackerError,
    },
}

impl TrackerOutcome {
    pub fn issue(&self) -> &IssueRecord {
        match self {
            TrackerOutcome::Synced(issue) => issue,
            TrackerOutcome::Degraded { issue, .. } => issue,
        }
    }

    pub fn error(&self) -> Option<&TrackerError> {
        match self {
            TrackerOutcome::Synced(_) => None,
            TrackerOutcome::Degraded { error, .. } => Some(error),
        }
    }

    pub fn into_issue(self) -> IssueRecord {
        match self {
            TrackerOutcome::Synced(issue) => issue,
            TrackerOutcome::Degraded { issue, .. } => issue,
        }
    }
}

pub struct IssueTrackerClient {
    backend: Box<dyn TrackerBackend>,
    issue_type: String,
}

impl IssueTrackerClient {
    pub fn new(backend: Box<dyn TrackerBackend>, issue_type: impl Into<String>) -> Self {
        IssueTrackerClient {
            backend,
            issue_type: issue_type.into(),
        }
    }

    /// Build a client talking HTTP according to `config`.
    ///
    /// `token_override` replaces the configured API token when present.
    pub fn from_config(
        config: &TrackerConfig,
        token_override: Option<&str>,
    ) -> Result<Self, TrackerError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_transport(config, token_override, Box::new(transport)))
    }

    /// Same as [IssueTrackerClient::from_config] over a caller-supplied transport
    pub fn with_transport(
        config: &TrackerConfig,
        token_override: Option<&str>,
        transport: Box<dyn HttpTransport>,
    ) -> Self {
        let backend: Box<dyn TrackerBackend> = match config.mode {
            TrackerMode::Mock => {
                let mut hosts = vec![config.base_url.clone()];
                hosts.extend(config.fallback_urls.iter().cloned());
                Box::new(MockApiTracker::new(transport, hosts, config.issue_type.clone()))
            }
            TrackerMode::Cloud => Box::new(CloudTracker::new(
                transport,
                &config.base_url,
                config.email.clone(),
                token_override.unwrap_or(&config.api_token).to_string(),
                config.done_transition_id.clone(),
                config.issue_type.clone(),
            )),
        };
        IssueTrackerClient::new(backend, config.issue_type.clone())
    }

    /// Make sure an issue for `key` exists and reflects the release.
    pub fn reconcile(&self, key: &str, version: &str) -> TrackerOutcome {
        let degraded = |issue: IssueRecord, error: TrackerError| {
            warn!(ticket = key, error = %error, "tracker sync degraded");
            TrackerOutcome::Degraded { issue, error }
        };
        let placeholder = || IssueRecord::placeholder(key, version, &self.issue_type);

        match self.backend.fetch(key) {
            Err(e) => degraded(placeholder(), e),
            Ok(None) => match self.backend.create(key, version) {
                Ok(issue) if issue.is_done() => {
                    info!(ticket = %issue.key, "tracker issue created");
                    TrackerOutcome::Synced(issue)
                }
                // Some trackers create issues in their initial state only
                Ok(issue) => match self.backend.mark_done(&issue) {
                    Ok(done) => {
                        info!(ticket = %done.key, "tracker issue created and closed");
                        TrackerOutcome::Synced(done)
                    }
                    Err(e) => degraded(issue, e),
                },
                Err(e) => degraded(placeholder(), e),
            },
            Ok(Some(existing)) => match self.backend.mark_done(&existing) {
                Ok(issue) => {
                    info!(ticket = %issue.key, status = %issue.status, "tracker issue updated");
                    TrackerOutcome::Synced(issue)
                }
                Err(e) => degraded(existing, e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_config() -> TrackerConfig {
        TrackerConfig {
            base_url: "http://tracker".into(),
            ..TrackerConfig::default()
        }
    }

    fn client(transport: &ScriptedTransport) -> IssueTrackerClient {
        IssueTrackerClient::with_transport(&mock_config(), None, Box::new(transport.clone()))
    }

    #[test]
    fn test_reconcile_creates_missing_issue() {
        let transport = ScriptedTransport::new()
            .respond(200, "[]")
            .respond(201, r#"{"id":3,"key":"ABC-1","summary":"Release 1.0.0 for ABC-1","status":"Done","type":"Task"}"#);
        let outcome = client(&transport).reconcile("ABC-1", "1.0.0");

        assert_eq!(outcome.error(), None);
        assert_eq!(outcome.issue().provenance, IssueProvenance::Created);
        assert_eq!(outcome.issue().status, "Done");
    }

    #[test]
    fn test_reconcile_marks_existing_done() {
        let transport = ScriptedTransport::new()
            .respond(200, r#"[{"id":3,"key":"ABC-1","summary":"Feature","status":"Open","type":"Story"}]"#)
            .respond(200, "{}");
        let outcome = client(&transport).reconcile("ABC-1", "1.0.0");

        assert!(matches!(outcome, TrackerOutcome::Synced(_)));
        assert_eq!(outcome.issue().status, "Done");
        assert_eq!(outcome.issue().summary, "Feature");
        assert_eq!(transport.requests()[1].method, HttpMethod::Put);
    }

    #[test]
    fn test_reconcile_unreachable_yields_placeholder() {
        let transport = ScriptedTransport::new();
        let outcome = client(&transport).reconcile("ABC-1", "1.0.0");

        let TrackerOutcome::Degraded { issue, error } = outcome else {
            panic!("expected degraded outcome");
        };
        assert!(error.is_transport());
        assert_eq!(issue.provenance, IssueProvenance::Placeholder);
        assert_eq!(issue.summary, "Release 1.0.0 for ABC-1");
    }

    #[test]
    fn test_reconcile_update_failure_keeps_fetched_record() {
        let transport = ScriptedTransport::new()
            .respond(200, r#"[{"id":3,"key":"ABC-1","summary":"Feature","status":"Open"}]"#)
            .respond(500, "oops");
        let outcome = client(&transport).reconcile("ABC-1", "1.0.0");

        assert!(outcome.error().is_some());
        assert_eq!(outcome.issue().summary, "Feature");
        assert_eq!(outcome.issue().status, "Open");
    }

    fn cloud_config() -> TrackerConfig {
        TrackerConfig {
            mode: TrackerMode::Cloud,
            base_url: "acme.atlassian.net".into(),
            email: "dev@acme.io".into(),
            api_token: "token".into(),
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn test_reconcile_closes_cloud_created_issue() {
        let transport = ScriptedTransport::new()
            .respond(404, "")
            .respond(201, r#"{"id":"10001","key":"ABC-1"}"#)
            .respond(204, "");
        let client =
            IssueTrackerClient::with_transport(&cloud_config(), None, Box::new(transport.clone()));
        let outcome = client.reconcile("ABC-1", "1.0.0");

        assert_eq!(outcome.error(), None);
        assert!(outcome.issue().is_done());
        assert_eq!(outcome.issue().provenance, IssueProvenance::Created);
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[2].url.ends_with("/issue/ABC-1/transitions"));
    }

    #[test]
    fn test_reconcile_created_issue_transition_failure_is_degraded() {
        let transport = ScriptedTransport::new()
            .respond(404, "")
            .respond(201, r#"{"id":"10001","key":"ABC-1"}"#)
            .respond(400, r#"{"errorMessages":["bad transition"]}"#);
        let client =
            IssueTrackerClient::with_transport(&cloud_config(), None, Box::new(transport.clone()));
        let outcome = client.reconcile("ABC-1", "1.0.0");

        assert!(outcome.error().is_some());
        assert_eq!(outcome.issue().status, "To Do");
        assert_eq!(outcome.issue().provenance, IssueProvenance::Created);
    }

    #[test]
    fn test_mock_created_issue_needs_no_transition() {
        let transport = ScriptedTransport::new()
            .respond(200, "[]")
            .respond(201, "");
        let outcome = client(&transport).reconcile("ABC-1", "1.0.0");

        assert!(outcome.issue().is_done());
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn test_cloud_token_override() {
        let transport = ScriptedTransport::new().respond(404, "");
        let config = TrackerConfig {
            mode: TrackerMode::Cloud,
            base_url: "acme.atlassian.net".into(),
            email: "dev@acme.io".into(),
            api_token: "from-file".into(),
            ..TrackerConfig::default()
        };
        let client = IssueTrackerClient::with_transport(
            &config,
            Some("from-env"),
            Box::new(transport.clone()),
        );
        client.reconcile("ABC-1", "1.0.0");

        assert_eq!(
            transport.requests()[0].basic_auth,
            Some(("dev@acme.io".to_string(), "from-env".to_string()))
        );
    }

    #[test]
    fn test_issue_record_serializes_type_field() {
        let issue = IssueRecord::placeholder("ABC-1", "1.0.0", "Task");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "Task");
        assert_eq!(json["provenance"], "placeholder");
        assert!(json.get("id").is_none());
    }
}
