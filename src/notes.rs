//! Markdown release notes committed onto the release branch.

use crate::domain::ReleaseIdentifier;
use crate::tracker::IssueRecord;

/// Render release notes for `identifier`.
///
/// The output depends only on its inputs, so re-running a release with the
/// same identity and issue produces byte-identical notes and no new commit.
/// The issue's status is left out: it moves between runs while the release
/// itself does not.
pub fn render_release_notes(
    identifier: &ReleaseIdentifier,
    issue: Option<&IssueRecord>,
    source_branch: &str,
) -> String {
    let mut lines = vec![
        format!("# Release {}", identifier.version),
        String::new(),
        format!("- Version: {}", identifier.version),
        format!("- Ticket: {}", identifier.ticket),
        format!("- Source branch: {}", source_branch),
        format!("- Release branch: {}", identifier.branch_name()),
        format!("- Tag: {}", identifier.tag_name()),
        format!("- Date: {}", identifier.date.format("%Y-%m-%d")),
    ];

    if let Some(issue) = issue {
        let or_na = |s: &str| if s.trim().is_empty() { "N/A".to_string() } else { s.to_string() };
        lines.extend([
            String::new(),
            "## Issue".to_string(),
            String::new(),
            format!("- Key: {}", issue.key),
            format!("- Summary: {}", or_na(&issue.summary)),
            format!("- Type: {}", or_na(&issue.issue_type)),
        ]);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
