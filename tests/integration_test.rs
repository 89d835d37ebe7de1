// tests/integration_test.rs
use std::process::Command;
use tempfile::TempDir;

fn git_promote() -> Command {
    Command::new(env!("CARGO_BIN_EXE_git-promote"))
}

#[test]
fn test_git_promote_help() {
    let output = git_promote()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("git-promote"));
    assert!(stdout.contains("--source-branch"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn test_git_promote_version() {
    let output = git_promote()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_source_branch_is_required() {
    let output = git_promote().output().expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_outside_repository_reports_error_json() {
    let dir = TempDir::new().unwrap();
    let output = git_promote()
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .args(["--repo", ".", "--source-branch", "feature/ABC-1-x", "--json"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["source_branch"], "feature/ABC-1-x");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("Failed to open repository"));
}
