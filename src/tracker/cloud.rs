//! Tracker flavor for Jira Cloud REST API v3.

use super::transport::{HttpMethod, HttpRequest, HttpTransport};
use super::{release_summary, IssueProvenance, IssueRecord, TrackerBackend, DONE_STATUS};
use crate::error::TrackerError;
use serde_json::{json, Value};
use tracing::debug;

pub struct CloudTracker {
    transport: Box<dyn HttpTransport>,
    api_root: String,
    email: String,
    api_token: String,
    done_transition_id: String,
    issue_type: String,
}

impl CloudTracker {
    pub fn new(
        transport: Box<dyn HttpTransport>,
        site: &str,
        email: impl Into<String>,
        api_token: impl Into<String>,
        done_transition_id: impl Into<String>,
        issue_type: impl Into<String>,
    ) -> Self {
        CloudTracker {
            transport,
            api_root: format!("{}/rest/api/3", normalize_site(site)),
            email: email.into(),
            api_token: api_token.into(),
            done_transition_id: done_transition_id.into(),
            issue_type: issue_type.into(),
        }
    }

    fn request(&self, method: HttpMethod, path: &str) -> Result<HttpRequest, TrackerError> {
        if self.email.trim().is_empty() {
            return Err(TrackerError::MissingCredentials("email"));
        }
        if self.api_token.trim().is_empty() {
            return Err(TrackerError::MissingCredentials("api_token"));
        }
        Ok(HttpRequest::new(method, format!("{}{}", self.api_root, path))
            .basic_auth(self.email.clone(), self.api_token.clone()))
    }
}

/// Accept a bare domain or a full site URL
fn normalize_site(site: &str) -> String {
    let site = site.trim().trim_end_matches('/');
    if site.starts_with("http://") || site.starts_with("https://") {
        site.to_string()
    } else {
        format!("https://{}", site)
    }
}

/// Issue body in Atlassian Document Format, which API v3 requires
fn release_description(version: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{
                "type": "text",
                "text": format!("Auto-created by release pipeline for version {}", version),
            }],
        }],
    })
}

/// Project key of an issue key: `ABC-123` -> `ABC`
fn project_key(issue_key: &str) -> &str {
    issue_key.split('-').next().unwrap_or(issue_key)
}

fn parse_cloud_issue(value: &Value) -> Result<IssueRecord, TrackerError> {
    let key = value
        .get("key")
        .and_then(Value::as_str)
        .ok_or(TrackerError::MissingField("key"))?;
    let fields = value.get("fields").ok_or(TrackerError::MissingField("fields"))?;
    let nested_name = |field: &str| {
        fields
            .get(field)
            .and_then(|f| f.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Ok(IssueRecord {
        id: value.get("id").and_then(Value::as_str).map(str::to_string),
        key: key.to_string(),
        summary: fields
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        status: nested_name("status"),
        issue_type: nested_name("issuetype"),
        provenance: IssueProvenance::Fetched,
    })
}

impl TrackerBackend for CloudTracker {
    fn fetch(&self, key: &str) -> Result<Option<IssueRecord>, TrackerError> {
        let request = self.request(HttpMethod::Get, &format!("/issue/{}", key))?;
        let response = self.transport.send(&request)?;
        if response.status == 404 {
            debug!(key, "issue not found");
            return Ok(None);
        }

        let value = response
            .error_for_status()?
            .json()?
            .ok_or_else(|| TrackerError::Parse("empty issue response".into()))?;
        parse_cloud_issue(&value).map(Some)
    }

    fn create(&self, key: &str, version: &str) -> Result<IssueRecord, TrackerError> {
        let summary = release_summary(key, version);
        let request = self.request(HttpMethod::Post, "/issue")?.json(json!({
            "fields": {
                "project": { "key": project_key(key) },
                "summary": summary,
                "description": release_description(version),
                "issuetype": { "name": self.issue_type },
            }
        }));

        let created = self.transport.send(&request)?.error_for_status()?.json()?;
        // The tracker assigns the key; the requested one is only a hint
        let (id, key) = match created {
            Some(value) => (
                value.get("id").and_then(Value::as_str).map(str::to_string),
                value
                    .get("key")
                    .and_then(Value::as_str)
                    .unwrap_or(key)
                    .to_string(),
            ),
            None => (None, key.to_string()),
        };

        Ok(IssueRecord {
            id,
            key,
            summary,
            status: "To Do".into(),
            issue_type: self.issue_type.clone(),
            provenance: IssueProvenance::Created,
        })
    }

    fn mark_done(&self, issue: &IssueRecord) -> Result<IssueRecord, TrackerError> {
        let request = self
            .request(HttpMethod::Post, &format!("/issue/{}/transitions", issue.key))?
            .json(json!({ "transition": { "id": self.done_transition_id } }));
        self.transport.send(&request)?.error_for_status()?;

        Ok(IssueRecord {
            status: DONE_STATUS.into(),
            ..issue.clone()
        })
    }
}
