// SnapTrace - Execution Snapshot Tracer
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tracing::info;

fn snaptrace() -> Command {
    let mut cmd = Command::cargo_bin("snaptrace").unwrap();
    cmd.env_remove("SNAPTRACE_CONFIG").env_remove("SNAPTRACE_ADAPTER");
    cmd
}

#[test]
fn test_help_command() {
    snaptrace_common::logging::ensure_test_logging(None);
    info!("Testing CLI help command");

    snaptrace()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Execution snapshot tracer"));
}

#[test]
fn test_version_command() {
    snaptrace_common::logging::ensure_test_logging(None);
    info!("Running test");
    snaptrace().arg("--version").assert().success().stdout(predicate::str::contains("snaptrace"));
}

#[test]
fn test_trace_subcommand_help() {
    snaptrace_common::logging::ensure_test_logging(None);
    info!("Running test");
    snaptrace()
        .arg("trace")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Trace a program"))
        .stdout(predicate::str::contains("--max-steps"));
}

#[test]
fn test_missing_subcommand() {
    snaptrace_common::logging::ensure_test_logging(None);
    info!("Running test");
    snaptrace().assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_invalid_language() {
    snaptrace_common::logging::ensure_test_logging(None);
    info!("Running test");
    snaptrace()
        .args(["config", "--language", "cobol"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported language"));
}

#[test]
fn test_config_shows_overrides() {
    snaptrace_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.toml");
    fs::write(&path, "[trace]\nmax_steps = 40\nmax_heap_nodes = 9\n").unwrap();

    snaptrace()
        .current_dir(dir.path())
        .arg("config")
        .arg("--config")
        .arg(&path)
        .args(["--max-steps", "12", "demo.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_steps = 12"))
        .stdout(predicate::str::contains("max_heap_nodes = 9"))
        .stdout(predicate::str::contains("debugpy.adapter"))
        .stdout(predicate::str::contains("demo.py"));
}

#[test]
fn test_missing_config_file() {
    snaptrace_common::logging::ensure_test_logging(None);
    info!("Running test");
    snaptrace()
        .args(["config", "--config", "/nonexistent/snaptrace.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_malformed_config_file() {
    snaptrace_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[trace]\nlanguage = \"cobol\"\n").unwrap();

    snaptrace()
        .arg("config")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("bad.toml"));
}

#[test]
fn test_unstartable_adapter_reports_one_error() {
    snaptrace_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = tempfile::tempdir().unwrap();

    snaptrace()
        .current_dir(dir.path())
        .env("RUST_LOG", "off")
        .args(["trace", "--adapter", "snaptrace-no-such-adapter-binary", "demo.py"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("could not start the debuggee"))
        .stderr(predicate::str::contains("Error:").count(1));
}

#[test]
fn test_java_requires_an_adapter() {
    snaptrace_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = tempfile::tempdir().unwrap();

    snaptrace()
        .current_dir(dir.path())
        .env("RUST_LOG", "off")
        .args(["trace", "--language", "java", "Main"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no debug adapter configured for java"));
}
