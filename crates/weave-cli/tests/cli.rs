// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Integration tests for the `weave` binary.

use std::path::PathBuf;
use std::process::{Command, Output};

fn weave(args: &[&PathBuf]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_weave"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run weave")
}

#[test]
fn sorts_and_merges_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let out = dir.path().join("out");
    std::fs::write(&a, "9 1 4").unwrap();
    std::fs::write(&b, "3 2\n").unwrap();

    let res = weave(&[&out, &a, &b]);
    assert!(
        res.status.success(),
        "weave failed:\nstdout: {}\nstderr: {}",
        String::from_utf8_lossy(&res.stdout),
        String::from_utf8_lossy(&res.stderr),
    );
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "1 2 3 4 9");
    let stdout = String::from_utf8_lossy(&res.stdout);
    assert!(stdout.contains("Sort OK"));
    assert!(stdout.contains("#0"));
    assert!(stdout.contains("#1"));
}

#[test]
fn missing_input_is_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a");
    let missing = dir.path().join("missing");
    let out = dir.path().join("out");
    std::fs::write(&a, "1").unwrap();

    let res = weave(&[&out, &a, &missing]);
    assert!(!res.status.success());
    let stderr = String::from_utf8_lossy(&res.stderr);
    assert!(stderr.contains("missing"));
    assert!(!out.exists());
}

#[test]
fn needs_at_least_one_input() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let res = weave(&[&out]);
    assert!(!res.status.success());
    assert!(!out.exists());
}

#[test]
fn failed_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a");
    let sub = dir.path().join("sub");
    let out = dir.path().join("out");
    std::fs::write(&a, "2 1").unwrap();
    std::fs::create_dir(&sub).unwrap();

    // A directory opens fine, so only the read inside the run fails.
    let res = weave(&[&out, &a, &sub]);
    assert!(!res.status.success());
    let stderr = String::from_utf8_lossy(&res.stderr);
    assert!(stderr.contains("sorting failed"));
    assert!(!out.exists());
}
