//! HTTP transport for tracker calls.
//!
//! Tracker flavors build [HttpRequest]s and interpret [HttpResponse]s; the
//! transport only moves bytes. [ReqwestTransport] is the real client,
//! [ScriptedTransport] replays canned responses for tests.

use crate::error::TrackerError;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<serde_json::Value>,
    /// (user, password) for HTTP basic auth
    pub basic_auth: Option<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        HttpRequest {
            method,
            url: url.into(),
            body: None,
            basic_auth: None,
        }
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        HttpResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [TrackerError::Status]
    pub fn error_for_status(self) -> Result<Self, TrackerError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TrackerError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }

    /// Parse the body as JSON; `None` for an empty body
    pub fn json(&self) -> Result<Option<serde_json::Value>, TrackerError> {
        if self.body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.body)
            .map(Some)
            .map_err(|e| TrackerError::Parse(e.to_string()))
    }
}

pub trait HttpTransport {
    /// Send one request. Connection-level failures map to [TrackerError::Transport];
    /// any HTTP status, including errors, is a successful send.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TrackerError>;
}

/// Blocking reqwest client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TrackerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::Transport(format!("cannot build HTTP client: {}", e)))?;
        Ok(ReqwestTransport { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TrackerError> {
        debug!(method = %request.method, url = %request.url, "tracker request");

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
        }
        .header(ACCEPT, "application/json");

        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .map_err(|e| TrackerError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TrackerError::Transport(e.to_string()))?;

        debug!(status, "tracker response");
        Ok(HttpResponse { status, body })
    }
}

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<Result<HttpResponse, TrackerError>>,
    requests: Vec<HttpRequest>,
}

/// Replays queued responses in order and records every request.
///
/// Clones share the same script, so a test can keep one handle and give
/// another to the tracker.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Rc<RefCell<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and body
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.script
            .borrow_mut()
            .responses
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    /// Queue a transport failure
    pub fn fail(self, error: TrackerError) -> Self {
        self.script.borrow_mut().responses.push_back(Err(error));
        self
    }

    /// Requests sent so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.script.borrow().requests.clone()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TrackerError> {
        let mut script = self.script.borrow_mut();
        script.requests.push(request.clone());
        script
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(TrackerError::Transport("connection refused".into())))
    }
}
