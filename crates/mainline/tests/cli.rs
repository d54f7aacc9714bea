//! Exit codes and output of the `mainline` executable.

mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::{built, line, network_data};

fn mainline(args: &[&str], database_url: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mainline"))
        .args(args)
        .env("MAINLINE_DATABASE_URL", database_url)
        .env_remove("DATABASE_URL")
        .env_remove("RUST_LOG")
        .output()
        .expect("should run mainline")
}

fn url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

#[test]
fn missing_store_exits_with_one() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let missing = dir.path().join("absent.db");

    let output = mainline(&["status"], &url(&missing));

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot connect to graph store"), "stderr: {stderr}");
    assert!(stderr.contains("absent.db"), "stderr: {stderr}");
    assert!(!missing.exists(), "status must not create the store");
}

#[test]
fn criticality_against_missing_store_exits_with_one() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let output = mainline(&["criticality"], &url(&dir.path().join("absent.db")));

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn blank_primary_variable_falls_back_to_database_url() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let output = Command::new(env!("CARGO_BIN_EXE_mainline"))
        .arg("status")
        .env("MAINLINE_DATABASE_URL", "")
        .env("DATABASE_URL", url(&dir.path().join("fallback.db")))
        .output()
        .expect("should run mainline");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("fallback.db"));
}

#[test]
fn criticality_batch_scores_an_existing_store() {
    let fx = built(&network_data(line(3), &[(10, 3)]));
    let database = url(fx.network.store().path());

    let output = mainline(&["criticality", "--sequential"], &database);
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Scores written"), "stdout: {stdout}");

    // The already open network sees the batch's scores
    assert_eq!(fx.network.status().expect("status").scored_edges, 3);

    let output = mainline(&["status"], &database);
    assert_eq!(output.status.code(), Some(0));
}
