//! CLI integration tests for sqlite-pg-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for various error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the sqlite-pg-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("sqlite-pg-migrate").unwrap()
}

/// A configuration that parses and validates but points at nothing real.
const VALID_CONFIG: &str = "\
source:
  path: /tmp/sqlite-pg-migrate-tests/does-not-exist.sqlite
target:
  host: localhost
  database: movies
  user: app
  password: secret
";

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--batch-size"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sqlite-pg-migrate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_output_json_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_from_env_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--from-env"));
}

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not config error (code 1)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "validate"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "validate"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_required_fields_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    // Valid YAML but no target section
    writeln!(file, "source:").unwrap();
    writeln!(file, "  path: db.sqlite").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "validate"])
        .assert()
        .code(1);
}

#[test]
fn test_zero_batch_size_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{VALID_CONFIG}migration:\n  batch_size: 0\n").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "validate"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_source_database_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{VALID_CONFIG}").unwrap();

    // Config parses fine; the pre-flight check on the source file fails.
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("source database not found"));
}

#[test]
fn test_from_env_missing_variables_exits_with_code_1() {
    cmd()
        .env_clear()
        .args(["--from-env", "validate"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing environment variables"));
}

// =============================================================================
// Subcommand Behavior Tests
// =============================================================================

#[test]
fn test_validate_requires_reachable_source() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{VALID_CONFIG}").unwrap();

    // Parses fine; fails on the source pre-flight check before touching
    // the target.
    cmd()
        .args(["--config", file.path().to_str().unwrap(), "validate"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("source database not found"));
}

#[test]
fn test_health_check_command_exists() {
    cmd()
        .args(["health-check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test database connections"));
}

#[test]
fn test_verify_command_exists() {
    cmd()
        .args(["verify", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("without writing"));
}

// =============================================================================
// Config Path Tests
// =============================================================================

#[test]
fn test_config_default_path() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_short_config_flag() {
    // -c should work as short for --config
    cmd()
        .args(["-c", "some_config.yaml", "--help"])
        .assert()
        .success();
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
