//! End-to-end tests for the `overlay-loader load` command.
//!
//! These tests verify the CLI behavior of the `load` command by invoking
//! the binary directly and checking its output.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;

/// Get a Command for the overlay-loader binary
fn overlay_loader_cmd() -> Command {
    let mut cmd = Command::cargo_bin("overlay-loader").unwrap();
    cmd.env_remove("OVERLAY_LOADER_CONFIG");
    cmd
}

// <tmp>
// ├── base
// │   ├── okayData
// │   └── symLinkToExteriorData -> ../exteriorData   (unix only)
// └── exteriorData
fn restriction_tree() -> (assert_fs::TempDir, PathBuf) {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("base/okayData").write_str("okay\n").unwrap();
    temp.child("exteriorData").write_str("exterior\n").unwrap();
    let real = std::fs::canonicalize(temp.path()).unwrap();
    #[cfg(unix)]
    std::os::unix::fs::symlink(
        real.join("exteriorData"),
        real.join("base/symLinkToExteriorData"),
    )
    .unwrap();
    (temp, real)
}

#[test]
fn test_load_help() {
    overlay_loader_cmd()
        .arg("load")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--via"));
}

#[test]
fn test_load_file_in_root() {
    let (_temp, real) = restriction_tree();

    overlay_loader_cmd()
        .arg("load")
        .arg("--root")
        .arg(real.join("base"))
        .arg("okayData")
        .assert()
        .success()
        .stdout("okay\n");
}

#[test]
fn test_load_through_base() {
    let (_temp, real) = restriction_tree();

    overlay_loader_cmd()
        .arg("load")
        .arg("--root")
        .arg(&real)
        .arg("--via")
        .arg("base")
        .arg("okayData")
        .assert()
        .success()
        .stdout("okay\n");
}

#[test]
fn test_load_outside_root_is_rejected_by_default() {
    let (_temp, real) = restriction_tree();

    overlay_loader_cmd()
        .arg("load")
        .arg("--root")
        .arg(real.join("base"))
        .arg("../exteriorData")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not in or below"));
}

#[test]
fn test_load_outside_root_with_restriction_none() {
    let (_temp, real) = restriction_tree();

    overlay_loader_cmd()
        .arg("--restriction")
        .arg("none")
        .arg("load")
        .arg("--root")
        .arg(real.join("base"))
        .arg("../exteriorData")
        .assert()
        .success()
        .stdout("exterior\n");
}

#[cfg(unix)]
#[test]
fn test_load_symlink_out_of_root() {
    let (_temp, real) = restriction_tree();

    overlay_loader_cmd()
        .arg("load")
        .arg("--root")
        .arg(real.join("base"))
        .arg("symLinkToExteriorData")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not in or below"));
}

#[test]
fn test_load_restriction_from_config_file() {
    let (temp, real) = restriction_tree();
    temp.child("loader.yaml")
        .write_str("restriction: none\n")
        .unwrap();

    overlay_loader_cmd()
        .arg("--config")
        .arg(temp.path().join("loader.yaml"))
        .arg("load")
        .arg("--root")
        .arg(real.join("base"))
        .arg("../exteriorData")
        .assert()
        .success()
        .stdout("exterior\n");

    // The command line wins over the file.
    overlay_loader_cmd()
        .arg("--config")
        .arg(temp.path().join("loader.yaml"))
        .arg("--restriction")
        .arg("root-only")
        .arg("load")
        .arg("--root")
        .arg(real.join("base"))
        .arg("../exteriorData")
        .assert()
        .failure();
}

#[test]
fn test_load_unsupported_scheme() {
    let (_temp, real) = restriction_tree();

    overlay_loader_cmd()
        .arg("load")
        .arg("--root")
        .arg(&real)
        .arg("httpsnotreal://example.com/resource.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported scheme"));
}

#[test]
fn test_load_missing_file() {
    let (_temp, real) = restriction_tree();

    overlay_loader_cmd()
        .arg("load")
        .arg("--root")
        .arg(&real)
        .arg("nope.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_load_invalid_restriction_flag() {
    overlay_loader_cmd()
        .arg("--restriction")
        .arg("everywhere")
        .arg("load")
        .arg("x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("everywhere"));
}
