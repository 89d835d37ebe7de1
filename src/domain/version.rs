use crate::error::VersionError;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Semantic version core (major.minor.patch).
///
/// Pre-release and build suffixes are not part of the value: anything after the
/// first `-` is dropped before parsing and never takes part in comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemanticVersion {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemanticVersion {
            major,
            minor,
            patch,
        }
    }

    /// Parse the numeric core of a version string (e.g. "1.2.3-rc1" -> 1.2.3)
    ///
    /// The core must be exactly three dot-separated non-negative integers.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let core = strip_suffix(trimmed);
        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::Malformed(trimmed.to_string()));
        }

        Ok(SemanticVersion {
            major: parse_component("major", parts[0])?,
            minor: parse_component("minor", parts[1])?,
            patch: parse_component("patch", parts[2])?,
        })
    }

    /// Permissive parse: non-numeric or missing components count as 0.
    ///
    /// Returns `None` only for an empty string.
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut parts = strip_suffix(trimmed)
            .split('.')
            .map(|p| p.parse::<u64>().unwrap_or(0));

        Some(SemanticVersion {
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
        })
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn strip_suffix(text: &str) -> &str {
    text.split_once('-').map_or(text, |(core, _)| core)
}

fn parse_component(component: &'static str, value: &str) -> Result<u64, VersionError> {
    let invalid = || VersionError::Component {
        component,
        value: value.to_string(),
    };

    // u64::from_str accepts a leading '+', which is not a version digit
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    value.parse::<u64>().map_err(|_| invalid())
}

/// Strict validator: `MAJOR.MINOR.PATCH` with no leading zeros and no suffix.
///
/// "1.2.3" passes; "1.2", "v1.2.3", "01.2.3" and "1.2.3-rc1" do not.
/// Components must also fit in a `u64`, since the planner compares them
/// numerically.
pub fn is_valid_semver(text: &str) -> bool {
    semver::Version::parse(text)
        .map(|v| v.pre.is_empty() && v.build.is_empty())
        .unwrap_or(false)
}

/// Total order over parsed versions: lexicographic over (major, minor, patch)
pub fn compare(a: &SemanticVersion, b: &SemanticVersion) -> Ordering {
    a.cmp(b)
}

/// Outcome of comparing two raw version strings that may be missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionComparison {
    Less,
    Equal,
    Greater,
    /// At least one side was absent, so no ordering exists
    Unknown,
}

impl VersionComparison {
    pub fn is_greater(&self) -> bool {
        matches!(self, VersionComparison::Greater)
    }
}

impl From<Ordering> for VersionComparison {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => VersionComparison::Less,
            Ordering::Equal => VersionComparison::Equal,
            Ordering::Greater => VersionComparison::Greater,
        }
    }
}

/// Compare two optional version strings with the permissive parser
pub fn compare_versions(a: Option<&str>, b: Option<&str>) -> VersionComparison {
    match (
        a.and_then(SemanticVersion::parse_lenient),
        b.and_then(SemanticVersion::parse_lenient),
    ) {
        (Some(a), Some(b)) => compare(&a, &b).into(),
        _ => VersionComparison::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let v = SemanticVersion::parse("1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
    }

    #[test]
    fn test_version_parse_ignores_prerelease_suffix() {
        let v = SemanticVersion::parse("1.4.0-rc.1").unwrap();
        assert_eq!(v, SemanticVersion::new(1, 4, 0));
    }

    #[test]
    fn test_version_parse_invalid() {
        assert_eq!(SemanticVersion::parse(""), Err(VersionError::Empty));
        assert!(matches!(
            SemanticVersion::parse("1.2"),
            Err(VersionError::Malformed(_))
        ));
        assert!(SemanticVersion::parse("1.2.3.4").is_err());
        assert!(SemanticVersion::parse("v1.2.3").is_err());
        assert!(SemanticVersion::parse("1.+2.3").is_err());
        assert!(matches!(
            SemanticVersion::parse("1.x.3"),
            Err(VersionError::Component {
                component: "minor",
                ..
            })
        ));
    }

    #[test]
    fn test_version_display_round_trip() {
        for text in ["0.0.0", "1.2.3", "10.20.30", "2024.1.0"] {
            let v = SemanticVersion::parse(text).unwrap();
            assert_eq!(v.to_string(), text);
        }
    }

    #[test]
    fn test_lenient_parse_defaults_components() {
        assert_eq!(
            SemanticVersion::parse_lenient("1.2"),
            Some(SemanticVersion::new(1, 2, 0))
        );
        assert_eq!(
            SemanticVersion::parse_lenient("1.x.7-beta"),
            Some(SemanticVersion::new(1, 0, 7))
        );
        assert_eq!(SemanticVersion::parse_lenient("   "), None);
    }

    #[test]
    fn test_is_valid_semver() {
        assert!(is_valid_semver("1.2.3"));
        assert!(is_valid_semver("0.0.0"));
        assert!(!is_valid_semver("1.2"));
        assert!(!is_valid_semver("v1.2.3"));
        assert!(!is_valid_semver("1.2.3-rc1"));
        assert!(!is_valid_semver("1.2.3+build.5"));
        assert!(!is_valid_semver("01.2.3"));
        assert!(!is_valid_semver(""));
    }

    #[test]
    fn test_is_valid_semver_rejects_oversized_components() {
        assert!(is_valid_semver("18446744073709551615.0.0"));
        assert!(!is_valid_semver("18446744073709551616.0.0"));
    }

    #[test]
    fn test_compare_is_antisymmetric() {
        let versions = [
            SemanticVersion::new(0, 9, 9),
            SemanticVersion::new(1, 0, 0),
            SemanticVersion::new(1, 2, 0),
            SemanticVersion::new(1, 10, 0),
            SemanticVersion::new(2, 0, 1),
        ];

        for a in &versions {
            assert_eq!(compare(a, a), Ordering::Equal);
            for b in &versions {
                assert_eq!(compare(a, b), compare(b, a).reverse());
            }
        }
    }

    #[test]
    fn test_compare_is_numeric_not_textual() {
        let a = SemanticVersion::parse("1.10.0").unwrap();
        let b = SemanticVersion::parse("1.9.0").unwrap();
        assert_eq!(compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_compare_versions_unknown_when_absent() {
        assert_eq!(compare_versions(None, None), VersionComparison::Unknown);
        assert_eq!(
            compare_versions(Some("1.0.0"), None),
            VersionComparison::Unknown
        );
        assert_eq!(
            compare_versions(Some("1.3.0"), Some("1.2.0")),
            VersionComparison::Greater
        );
        assert_eq!(
            compare_versions(Some("1.2.0-rc1"), Some("1.2.0")),
            VersionComparison::Equal
        );
    }
}
