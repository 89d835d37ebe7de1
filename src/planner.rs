//! Release decision: compares production and source versions and, when a
//! release is due, derives the identifiers the executor works with.

use crate::domain::{
    compare_versions, is_valid_semver, InvalidReason, NoChangeReason, ReleaseDecision,
    ReleaseIdentifier, TicketExtractor, VersionComparison,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Final gate applied once the source version is known to be valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionGatePolicy {
    /// Any difference from production triggers a release, downgrades included
    #[default]
    AnyChange,
    /// Source must be strictly greater than a parsable production version
    ForwardOnly,
}

pub struct ReleasePlanner {
    policy: VersionGatePolicy,
    extractor: TicketExtractor,
}

impl ReleasePlanner {
    pub fn new(policy: VersionGatePolicy, extractor: TicketExtractor) -> Self {
        ReleasePlanner { policy, extractor }
    }

    /// Decide for today's UTC date
    pub fn plan(
        &self,
        production: Option<&str>,
        source: Option<&str>,
        branch: &str,
    ) -> ReleaseDecision {
        self.plan_on(production, source, branch, None, Utc::now().date_naive())
    }

    /// Decide for an explicit date, optionally with a ticket that bypasses extraction
    pub fn plan_on(
        &self,
        production: Option<&str>,
        source: Option<&str>,
        branch: &str,
        ticket_override: Option<&str>,
        date: NaiveDate,
    ) -> ReleaseDecision {
        let production = production.map(str::trim).filter(|v| !v.is_empty());
        let source = match source.map(str::trim).filter(|v| !v.is_empty()) {
            Some(source) => source,
            None => {
                return ReleaseDecision::InvalidVersion {
                    reason: InvalidReason::NoVersionDetected,
                    value: None,
                }
            }
        };

        if !is_valid_semver(source) {
            return ReleaseDecision::InvalidVersion {
                reason: InvalidReason::NotSemver,
                value: Some(source.to_string()),
            };
        }

        if Some(source) == production {
            debug!(version = source, "source version matches production");
            return ReleaseDecision::NoChange {
                reason: NoChangeReason::Unchanged,
                source: source.to_string(),
                production: production.map(str::to_string),
            };
        }

        if self.policy == VersionGatePolicy::ForwardOnly {
            let comparison = compare_versions(Some(source), production);
            if comparison != VersionComparison::Unknown && !comparison.is_greater() {
                debug!(
                    source,
                    production = production.unwrap_or_default(),
                    "source version is not ahead of production"
                );
                return ReleaseDecision::NoChange {
                    reason: NoChangeReason::NotAhead,
                    source: source.to_string(),
                    production: production.map(str::to_string),
                };
            }
        }

        let ticket = match ticket_override.map(str::trim).filter(|t| !t.is_empty()) {
            Some(ticket) => ticket.to_string(),
            None => self.extractor.extract(branch),
        };
        let identifier = ReleaseIdentifier::new(ticket, source, date);
        info!(
            branch = %identifier.branch_name(),
            tag = %identifier.tag_name(),
            "release planned"
        );
        ReleaseDecision::Proceed(identifier)
    }
}

impl Default for ReleasePlanner {
    fn default() -> Self {
        ReleasePlanner::new(VersionGatePolicy::default(), TicketExtractor::default())
    }
}
