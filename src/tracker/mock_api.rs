//! Tracker flavor for the lightweight REST mock service.
//!
//! Issues live under `{base}/issues`, looked up by `?key=` and updated by id.
//! When a host is unreachable the next configured host is tried.

use super::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use super::{release_summary, IssueProvenance, IssueRecord, TrackerBackend, DONE_STATUS};
use crate::error::TrackerError;
use reqwest::Url;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub struct MockApiTracker {
    transport: Box<dyn HttpTransport>,
    hosts: Vec<String>,
    issue_type: String,
}

impl MockApiTracker {
    /// `hosts` are tried in order; the first is the primary
    pub fn new(
        transport: Box<dyn HttpTransport>,
        hosts: Vec<String>,
        issue_type: impl Into<String>,
    ) -> Self {
        MockApiTracker {
            transport,
            hosts: hosts
                .into_iter()
                .map(|h| h.trim().trim_end_matches('/').to_string())
                .filter(|h| !h.is_empty())
                .collect(),
            issue_type: issue_type.into(),
        }
    }

    /// Send to each host in turn until one answers at the HTTP level
    fn send<F>(&self, build: F) -> Result<HttpResponse, TrackerError>
    where
        F: Fn(&str) -> Result<HttpRequest, TrackerError>,
    {
        let mut last_error = TrackerError::Transport("no tracker hosts configured".into());
        for host in &self.hosts {
            let request = build(host)?;
            match self.transport.send(&request) {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transport() => {
                    warn!(host = %host, error = %e, "tracker host unreachable");
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }
}

/// Build an issue from the service's JSON representation
fn parse_issue(value: &Value, provenance: IssueProvenance) -> Result<IssueRecord, TrackerError> {
    let text = |field: &str| {
        value
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let key = value
        .get("key")
        .and_then(Value::as_str)
        .ok_or(TrackerError::MissingField("key"))?;
    // json-server style ids may be numeric
    let id = match value.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Ok(IssueRecord {
        id,
        key: key.to_string(),
        summary: text("summary"),
        status: text("status"),
        issue_type: text("type"),
        provenance,
    })
}

fn issues_url(host: &str) -> String {
    format!("{}/issues", host)
}

impl TrackerBackend for MockApiTracker {
    fn fetch(&self, key: &str) -> Result<Option<IssueRecord>, TrackerError> {
        let response = self
            .send(|host| {
                let url = Url::parse_with_params(&issues_url(host), &[("key", key)])
                    .map_err(|e| TrackerError::Transport(format!("invalid tracker url: {}", e)))?;
                Ok(HttpRequest::new(HttpMethod::Get, url.to_string()))
            })?
            .error_for_status()?;

        let issue = match response.json()? {
            Some(Value::Array(items)) => items.into_iter().next(),
            Some(obj @ Value::Object(_)) if obj.get("key").is_some() => Some(obj),
            Some(Value::Object(_)) | None => None,
            Some(other) => {
                return Err(TrackerError::Parse(format!(
                    "unexpected issue payload: {}",
                    other
                )))
            }
        };

        debug!(key, found = issue.is_some(), "tracker lookup");
        issue
            .map(|value| parse_issue(&value, IssueProvenance::Fetched))
            .transpose()
    }

    fn create(&self, key: &str, version: &str) -> Result<IssueRecord, TrackerError> {
        let payload = json!({
            "key": key,
            "summary": release_summary(key, version),
            "status": DONE_STATUS,
            "type": self.issue_type,
            "fixVersion": version,
        });

        let response = self
            .send(|host| Ok(HttpRequest::new(HttpMethod::Post, issues_url(host)).json(payload.clone())))?
            .error_for_status()?;

        // Some mock services echo nothing useful; the payload is what was stored
        match response.json() {
            Ok(Some(value)) if value.get("key").is_some() => {
                parse_issue(&value, IssueProvenance::Created)
            }
            _ => parse_issue(&payload, IssueProvenance::Created),
        }
    }

    fn mark_done(&self, issue: &IssueRecord) -> Result<IssueRecord, TrackerError> {
        let id = issue.id.as_deref().ok_or(TrackerError::MissingField("id"))?;
        let payload = json!({
            "id": id,
            "key": issue.key,
            "summary": issue.summary,
            "status": DONE_STATUS,
            "type": issue.issue_type,
        });

        let response = self
            .send(|host| {
                Ok(HttpRequest::new(HttpMethod::Put, format!("{}/{}", issues_url(host), id))
                    .json(payload.clone()))
            })?
            .error_for_status()?;

        let mut updated = match response.json() {
            Ok(Some(value)) if value.get("key").is_some() => {
                parse_issue(&value, IssueProvenance::Fetched)?
            }
            _ => IssueRecord {
                status: DONE_STATUS.into(),
                ..issue.clone()
            },
        };
        updated.provenance = IssueProvenance::Fetched;
        Ok(updated)
    }
}
