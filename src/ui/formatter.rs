//! Pure formatting functions for UI output.
//!
//! `render_*` functions build the text and are tested directly; `display_*`
//! functions only print it.

use console::style;

use crate::orchestration::{OutcomeStatus, ReleaseOutcome};
use crate::tracker::IssueRecord;
use crate::warning::ReleaseWarning;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

pub fn display_warning(warning: &ReleaseWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Version comparison line, e.g. `main 1.2.0 -> feature/x 1.3.0`
pub fn render_versions(outcome: &ReleaseOutcome, production_branch: &str) -> String {
    format!(
        "{} {} -> {} {}",
        production_branch,
        outcome.production_version.as_deref().unwrap_or("(none)"),
        outcome.source_branch,
        outcome.version.as_deref().unwrap_or("(none)")
    )
}

/// Key/value lines describing the release artifacts, empty when nothing was planned
pub fn render_release_details(outcome: &ReleaseOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(ticket) = &outcome.ticket {
        lines.push(format!("Ticket:  {}", ticket));
    }
    if let Some(branch) = &outcome.branch {
        lines.push(format!("Branch:  {}", branch));
    }
    if let Some(tag) = &outcome.tag {
        lines.push(format!("Tag:     {}", tag));
    }
    if let Some(issue) = &outcome.issue {
        lines.push(format!("Issue:   {}", render_issue(issue)));
    }
    lines
}

pub fn render_issue(issue: &IssueRecord) -> String {
    let summary = if issue.summary.is_empty() {
        "N/A"
    } else {
        issue.summary.as_str()
    };
    format!("{} [{}] {}", issue.key, issue.status, summary)
}

/// Print a full outcome: versions, artifacts, warnings, then the status line
pub fn display_outcome(outcome: &ReleaseOutcome, production_branch: &str) {
    display_status(&render_versions(outcome, production_branch));

    let details = render_release_details(outcome);
    if !details.is_empty() {
        println!("\n{}", style("Release:").bold());
        for line in details {
            println!("  {}", line);
        }
        println!();
    }

    for warning in &outcome.warnings {
        display_warning(warning);
    }

    match outcome.status {
        OutcomeStatus::Success => display_success(&outcome.message),
        OutcomeStatus::NoChange => display_status(&outcome.message),
        OutcomeStatus::Invalid | OutcomeStatus::Error => display_error(&outcome.message),
    }

    if outcome.push_failed {
        display_status(&format!(
            "Local release refs may be ahead of the remote; re-run to push {}",
            outcome.branch.as_deref().unwrap_or("the release branch")
        ));
    }
}
