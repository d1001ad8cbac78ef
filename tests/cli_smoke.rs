//! Behavioural smoke tests for the CLI entrypoint.
//!
//! These exercise argument and configuration handling only; nothing here
//! reaches the network.

use assert_cmd::Command;
use predicates::str::contains;

fn symsend() -> Command {
    let mut cmd = Command::cargo_bin("symsend").unwrap_or_else(|err| panic!("binary: {err}"));
    cmd.env_remove("DWARF_DSYM_FOLDER_PATH");
    cmd
}

#[test]
fn help_documents_the_flags() {
    symsend()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--search-path"))
        .stdout(contains("--no-wait"))
        .stdout(contains("--max-wait"));
}

#[test]
fn missing_credentials_fail_fast() {
    symsend()
        .assert()
        .failure()
        .code(1)
        .stderr(contains("configuration error"))
        .stderr(contains("--token"));
}

#[test]
fn missing_search_path_names_the_environment_variable() {
    symsend()
        .args(["--token", "t", "--api-key", "k"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("DWARF_DSYM_FOLDER_PATH"));
}

#[test]
fn config_file_errors_are_reported() {
    symsend()
        .args(["--config-file", "/nonexistent/flurry.toml"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("failed to read"));
}
