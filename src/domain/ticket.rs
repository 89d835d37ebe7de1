use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Default key used when no strategy finds a ticket in the branch name
pub const DEFAULT_FALLBACK_TICKET: &str = "BACKEND";

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Z]+-\d+").expect("ticket key pattern is valid"))
}

/// How a ticket key is pulled out of a branch name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStrategy {
    /// First `PROJECT-123` occurrence anywhere in the name
    KeyPattern,
    /// `refs/heads/feature/abc-thing` -> `abc`
    PathSegment,
}

impl TicketStrategy {
    pub fn apply(&self, branch: &str) -> Option<String> {
        match self {
            TicketStrategy::KeyPattern => key_pattern()
                .find(branch)
                .map(|m| m.as_str().to_string()),
            TicketStrategy::PathSegment => {
                let name = branch.strip_prefix("refs/heads/").unwrap_or(branch);
                let segment = name.split_once('/').map_or(name, |(_, rest)| rest);
                let token = segment.split('-').next().unwrap_or_default();
                if token.is_empty() {
                    None
                } else {
                    Some(token.to_string())
                }
            }
        }
    }
}

/// Derives an issue-tracker key from a branch name.
///
/// Strategies are tried in order and the first hit wins; the fallback key is
/// returned when none match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketExtractor {
    strategies: Vec<TicketStrategy>,
    fallback: String,
}

impl TicketExtractor {
    pub fn new(strategies: Vec<TicketStrategy>, fallback: impl Into<String>) -> Self {
        TicketExtractor {
            strategies,
            fallback: fallback.into(),
        }
    }

    pub fn extract(&self, branch: &str) -> String {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.apply(branch))
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

impl Default for TicketExtractor {
    fn default() -> Self {
        TicketExtractor::new(vec![TicketStrategy::KeyPattern], DEFAULT_FALLBACK_TICKET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_key_pattern() {
        let extractor = TicketExtractor::default();
        assert_eq!(extractor.extract("feature/ABC-123-do-thing"), "ABC-123");
    }

    #[test]
    fn test_extract_first_match_wins() {
        let extractor = TicketExtractor::default();
        assert_eq!(extractor.extract("fix/OPS-7-and-OPS-8"), "OPS-7");
    }

    #[test]
    fn test_extract_falls_back() {
        let extractor = TicketExtractor::default();
        assert_eq!(extractor.extract("chore/cleanup"), "BACKEND");
        assert_eq!(extractor.extract("feature/abc-123"), "BACKEND");
    }

    #[test]
    fn test_path_segment_strategy() {
        let strategy = TicketStrategy::PathSegment;
        assert_eq!(
            strategy.apply("refs/heads/feature/PAY42-new-flow"),
            Some("PAY42".to_string())
        );
        assert_eq!(strategy.apply("hotfix"), Some("hotfix".to_string()));
        assert_eq!(strategy.apply("feature/-oops"), None);
    }

    #[test]
    fn test_strategy_order() {
        let extractor = TicketExtractor::new(
            vec![TicketStrategy::KeyPattern, TicketStrategy::PathSegment],
            "TICKET",
        );
        assert_eq!(extractor.extract("feature/ABC-123-x"), "ABC-123");
        assert_eq!(extractor.extract("feature/login-page"), "login");
        assert_eq!(extractor.extract(""), "TICKET");
    }

    #[test]
    fn test_no_strategies_always_fallback() {
        let extractor = TicketExtractor::new(Vec::new(), "NONE");
        assert_eq!(extractor.extract("feature/ABC-1"), "NONE");
        assert_eq!(extractor.fallback(), "NONE");
    }
}
