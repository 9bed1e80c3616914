//! CLI integration tests for ktpack.
//!
//! These tests drive the binary against modules written to a temp dir.
//! None of them touch the network.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the ktpack binary command, isolated from the user's home.
fn ktpack(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ktpack").unwrap();
    cmd.env("KTPACK_HOME", home);
    cmd
}

/// Write a module named `name` with the given manifest.
fn write_module(base: &Path, name: &str, manifest: &str) -> std::path::PathBuf {
    let dir = base.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("pack.toml"), manifest).unwrap();
    dir
}

// ============================================================================
// ktpack --help / completions
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let tmp = TempDir::new().unwrap();

    ktpack(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Kotlin Multiplatform"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("toolchain"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();

    ktpack(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ktpack"));
}

// ============================================================================
// ktpack tree
// ============================================================================

#[test]
fn test_tree_with_local_dependency() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("lib")).unwrap();
    let dir = write_module(
        tmp.path(),
        "app",
        "[module]\nname = \"app\"\nversion = \"1.0.0\"\n\n[dependencies.common]\nlib = { path = \"../lib\" }\n",
    );

    ktpack(&tmp.path().join("home"))
        .args(["tree", "--target", "jvm"])
        .current_dir(&dir)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("app v1.0.0"))
        .stdout(predicate::str::contains("└── "))
        .stdout(predicate::str::contains("lib"));
}

#[test]
fn test_tree_reports_missing_local_dependency() {
    let tmp = TempDir::new().unwrap();
    let dir = write_module(
        tmp.path(),
        "app",
        "[module]\nname = \"app\"\nversion = \"1.0.0\"\n\n[dependencies.common]\nlib = { path = \"../missing\" }\n",
    );

    ktpack(&tmp.path().join("home"))
        .args(["tree", "--target", "jvm"])
        .current_dir(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("(failed: local dependency path does not exist"))
        .stderr(predicate::str::contains("could not be resolved"));
}

#[test]
fn test_tree_fails_without_manifest() {
    let tmp = TempDir::new().unwrap();

    ktpack(&tmp.path().join("home"))
        .arg("tree")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find `pack.toml`"));
}

#[test]
fn test_tree_undeclared_target() {
    let tmp = TempDir::new().unwrap();
    let dir = write_module(
        tmp.path(),
        "app",
        "[module]\nname = \"app\"\nversion = \"1.0.0\"\ntargets = [\"jvm\"]\n",
    );

    ktpack(&tmp.path().join("home"))
        .args(["tree", "--target", "linux_x64"])
        .current_dir(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "module `app` does not declare target `linux_x64`",
        ));
}

#[test]
fn test_tree_unknown_target() {
    let tmp = TempDir::new().unwrap();
    let dir = write_module(tmp.path(), "app", "[module]\nname = \"app\"\nversion = \"1.0.0\"\n");

    ktpack(&tmp.path().join("home"))
        .args(["tree", "--target", "solaris"])
        .current_dir(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown target `solaris`"));
}

// ============================================================================
// ktpack build
// ============================================================================

#[test]
fn test_build_without_sources_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let dir = write_module(tmp.path(), "empty", "[module]\nname = \"empty\"\nversion = \"1.0.0\"\n");

    ktpack(&tmp.path().join("home"))
        .args(["build", "--target", "jvm"])
        .current_dir(&dir)
        .assert()
        .success()
        .stderr(predicate::str::contains("no source files"));

    assert!(!dir.join("out").exists());
}

#[test]
fn test_build_reports_manifest_path() {
    let tmp = TempDir::new().unwrap();
    let dir = write_module(tmp.path(), "broken", "[module]\nname = \"broken\"\n");

    ktpack(&tmp.path().join("home"))
        .arg("build")
        .current_dir(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse manifest"))
        .stderr(predicate::str::contains("pack.toml"));
}

#[test]
fn test_build_rejects_lib_and_test() {
    let tmp = TempDir::new().unwrap();

    ktpack(tmp.path())
        .args(["build", "--lib", "--test"])
        .assert()
        .failure();
}

// ============================================================================
// ktpack toolchain
// ============================================================================

#[test]
fn test_toolchain_list_empty_home() {
    let tmp = TempDir::new().unwrap();

    ktpack(tmp.path())
        .args(["toolchain", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kotlin:"))
        .stdout(predicate::str::contains("jdk:"))
        .stdout(predicate::str::contains("(none)"));
}

#[test]
fn test_toolchain_list_finds_installs() {
    let tmp = TempDir::new().unwrap();
    let node = tmp.path().join("nodejs/node-v20.11.0-linux-x64/bin");
    fs::create_dir_all(&node).unwrap();
    fs::write(node.join("node"), "").unwrap();

    ktpack(tmp.path())
        .args(["toolchain", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("20.11.0"));
}

#[test]
fn test_toolchain_install_rejects_unknown_kind() {
    let tmp = TempDir::new().unwrap();

    ktpack(tmp.path())
        .args(["toolchain", "install", "gradle"])
        .assert()
        .failure();
}
