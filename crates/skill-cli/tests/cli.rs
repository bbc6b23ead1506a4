//! End-to-end smoke tests driving the `skill` binary, in the teacher's
//! `assert_cmd`-based acceptance-test style.

use assert_cmd::Command;
use predicates::prelude::*;

fn cli(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("skill").unwrap();
    cmd.current_dir(dir);
    cmd
}

#[test]
fn run_evaluates_an_expression() {
    let dir = tempfile::tempdir().unwrap();
    cli(dir.path())
        .args(["run", "1 + 1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2"));
}

#[test]
fn run_surfaces_a_contained_error() {
    let dir = tempfile::tempdir().unwrap();
    cli(dir.path())
        .args(["run", "error('boom')"])
        .assert()
        .failure();
}

#[test]
fn skills_add_then_list_then_remove() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("greet.lua");
    std::fs::write(&source, "function run(params) return 'hi' end").unwrap();

    cli(dir.path())
        .args(["skills", "add", "greet", source.to_str().unwrap()])
        .assert()
        .success();

    cli(dir.path())
        .args(["skills", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("greet"));

    cli(dir.path())
        .args(["skills", "remove", "greet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed"));
}

#[test]
fn deps_add_is_rejected_when_policy_disallows() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("skill.toml"),
        "[deps]\npolicy = \"disallow\"\n",
    )
    .unwrap();

    cli(dir.path())
        .args(["deps", "add", "some-package"])
        .assert()
        .failure();
}

#[test]
fn tools_list_is_empty_with_no_tools_directory() {
    let dir = tempfile::tempdir().unwrap();
    cli(dir.path())
        .args(["tools", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no tools found"));
}
