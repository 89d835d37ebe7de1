use crate::domain::ticket::{TicketStrategy, DEFAULT_FALLBACK_TICKET};
use crate::error::{ReleaseError, Result};
use crate::planner::VersionGatePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "gitpromote.toml";

/// Represents the complete configuration for git-promote.
///
/// One typed struct covers every workflow variant: production branch, manifest
/// search, ticket extraction, version gate policy, release artifacts and tracker sync.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_production_branch")]
    pub production_branch: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default)]
    pub committer: Option<CommitterIdentity>,

    #[serde(default)]
    pub manifest: ManifestConfig,

    #[serde(default)]
    pub ticket: TicketConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub release: ReleaseConfig,

    /// Absent means tracker sync is disabled
    #[serde(default)]
    pub tracker: Option<TrackerConfig>,
}

fn default_production_branch() -> String {
    "main".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

/// Name and email used for release commits and tags
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CommitterIdentity {
    pub name: String,
    pub email: String,
}

/// Returns the default ordered list of manifest candidates.
fn default_manifest_candidates() -> Vec<String> {
    vec![
        "pyproject.toml".to_string(),
        "package.json".to_string(),
        "project.toml".to_string(),
    ]
}

/// Where to look for the version field.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ManifestConfig {
    /// Sub-project directory, relative to the repository root
    #[serde(default)]
    pub project_path: String,

    #[serde(default = "default_manifest_candidates")]
    pub candidates: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        ManifestConfig {
            project_path: String::new(),
            candidates: default_manifest_candidates(),
        }
    }
}

fn default_ticket_strategies() -> Vec<TicketStrategy> {
    vec![TicketStrategy::KeyPattern]
}

fn default_ticket_fallback() -> String {
    DEFAULT_FALLBACK_TICKET.to_string()
}

/// Ticket extraction settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TicketConfig {
    #[serde(default = "default_ticket_strategies")]
    pub strategies: Vec<TicketStrategy>,

    #[serde(default = "default_ticket_fallback")]
    pub fallback: String,
}

impl Default for TicketConfig {
    fn default() -> Self {
        TicketConfig {
            strategies: default_ticket_strategies(),
            fallback: default_ticket_fallback(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct PolicyConfig {
    #[serde(default)]
    pub version_gate: VersionGatePolicy,
}

fn default_notes_path() -> String {
    "RELEASE_NOTES.md".to_string()
}

fn default_commit_message() -> String {
    "chore: release {version}".to_string()
}

fn default_tag_message() -> String {
    "Release version {version}".to_string()
}

/// Release artifact settings. Messages accept `{version}` and `{ticket}`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ReleaseConfig {
    #[serde(default = "default_notes_path")]
    pub notes_path: String,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default = "default_tag_message")]
    pub tag_message: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            notes_path: default_notes_path(),
            commit_message: default_commit_message(),
            tag_message: default_tag_message(),
        }
    }
}

/// Which tracker API flavor to speak
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackerMode {
    #[default]
    Mock,
    Cloud,
}

fn default_tracker_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_done_transition_id() -> String {
    "31".to_string()
}

fn default_issue_type() -> String {
    "Task".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Issue tracker connection settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    #[serde(default)]
    pub mode: TrackerMode,

    /// Mock: service root. Cloud: site URL or bare domain.
    #[serde(default = "default_tracker_base_url")]
    pub base_url: String,

    /// Mock mode only: hosts tried in order when the previous one is unreachable
    #[serde(default)]
    pub fallback_urls: Vec<String>,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub api_token: String,

    #[serde(default = "default_done_transition_id")]
    pub done_transition_id: String,

    #[serde(default = "default_issue_type")]
    pub issue_type: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            mode: TrackerMode::default(),
            base_url: default_tracker_base_url(),
            fallback_urls: Vec::new(),
            email: String::new(),
            api_token: String::new(),
            done_transition_id: default_done_transition_id(),
            issue_type: default_issue_type(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            production_branch: default_production_branch(),
            remote: default_remote(),
            committer: None,
            manifest: ManifestConfig::default(),
            ticket: TicketConfig::default(),
            policy: PolicyConfig::default(),
            release: ReleaseConfig::default(),
            tracker: None,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)
            .map_err(|e| ReleaseError::config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the workflow cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.production_branch.trim().is_empty() {
            return Err(ReleaseError::config("production_branch must not be empty"));
        }
        if self.remote.trim().is_empty() {
            return Err(ReleaseError::config("remote must not be empty"));
        }
        if self.manifest.candidates.is_empty() {
            return Err(ReleaseError::config(
                "manifest.candidates must list at least one file",
            ));
        }
        if self.release.notes_path.trim().is_empty() {
            return Err(ReleaseError::config("release.notes_path must not be empty"));
        }
        if let Some(tracker) = &self.tracker {
            if tracker.base_url.trim().is_empty() {
                return Err(ReleaseError::config("tracker.base_url must not be empty"));
            }
            if tracker.timeout_secs == 0 {
                return Err(ReleaseError::config("tracker.timeout_secs must be at least 1"));
            }
            if tracker.mode == TrackerMode::Cloud && tracker.done_transition_id.trim().is_empty()
            {
                return Err(ReleaseError::config(
                    "tracker.done_transition_id is required in cloud mode",
                ));
            }
        }
        Ok(())
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitpromote.toml` in current directory
/// 3. `.gitpromote.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read, parsed or validated
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)
            .map_err(|e| ReleaseError::config(format!("Cannot read '{}': {}", path, e)))?
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        fs::read_to_string(CONFIG_FILE_NAME)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let user_path = config_dir.join(format!(".{}", CONFIG_FILE_NAME));
        if user_path.exists() {
            fs::read_to_string(user_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    Config::from_toml(&config_str)
}
