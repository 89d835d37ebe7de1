use chrono::NaiveDate;
use std::fmt;

/// Identifies one release: which ticket, which version, which day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseIdentifier {
    pub ticket: String,
    pub version: String,
    pub date: NaiveDate,
}

impl ReleaseIdentifier {
    pub fn new(ticket: impl Into<String>, version: impl Into<String>, date: NaiveDate) -> Self {
        ReleaseIdentifier {
            ticket: ticket.into(),
            version: version.into(),
            date,
        }
    }

    /// Creation date as `YYYYMMDD`
    pub fn date_stamp(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// `release/<ticket>-<version>-<YYYYMMDD>`
    pub fn branch_name(&self) -> String {
        format!(
            "release/{}-{}-{}",
            self.ticket,
            self.version,
            self.date_stamp()
        )
    }

    /// `v<version>`
    pub fn tag_name(&self) -> String {
        format!("v{}", self.version)
    }

    /// Substitute `{version}` and `{ticket}` in a message template
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{version}", &self.version)
            .replace("{ticket}", &self.ticket)
    }
}

/// Why a source version was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    NoVersionDetected,
    NotSemver,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::NoVersionDetected => write!(f, "no version detected on source ref"),
            InvalidReason::NotSemver => write!(f, "not a valid semantic version"),
        }
    }
}

/// Why no release is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoChangeReason {
    /// Source and production carry the same version
    Unchanged,
    /// Source is behind production and only forward moves are allowed
    NotAhead,
}

/// The single decision made per run; never mutated afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseDecision {
    NoChange {
        reason: NoChangeReason,
        source: String,
        production: Option<String>,
    },
    InvalidVersion {
        reason: InvalidReason,
        value: Option<String>,
    },
    Proceed(ReleaseIdentifier),
}

impl ReleaseDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, ReleaseDecision::Proceed(_))
    }

    pub fn identifier(&self) -> Option<&ReleaseIdentifier> {
        match self {
            ReleaseDecision::Proceed(id) => Some(id),
            _ => None,
        }
    }
}
