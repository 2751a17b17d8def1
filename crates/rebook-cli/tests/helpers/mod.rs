#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;
use uuid::Uuid;

/// Test harness for running CLI commands with temporary databases
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with a temporary database
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("rebook").expect("Failed to find rebook binary");

        cmd.current_dir(self.temp_dir.path());
        cmd.env("REBOOK_DATABASE_PATH", &self.db_path);
        cmd.env("REBOOK_DEFAULT_TIMEZONE", "UTC");
        cmd.env_remove("RUST_LOG");

        cmd
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Runs a command that must succeed and returns its stdout
    pub fn stdout_of(&self, args: &[&str]) -> String {
        let output = self.run_success(args).get_output().stdout.clone();
        String::from_utf8(output).expect("stdout should be UTF-8")
    }

    /// Creates a pattern and returns its id
    pub fn create_pattern(&self, args: &[&str]) -> String {
        let mut full = vec!["pattern", "create"];
        full.extend_from_slice(args);
        let stdout = self.stdout_of(&full);
        uuids_in(&stdout)
            .into_iter()
            .next()
            .expect("pattern id in output")
            .to_string()
    }

    /// Confirms every bookable occurrence of a pattern; returns the series id and
    /// the appointment ids in sequence order
    pub fn confirm(&self, pattern_id: &str, title: &str) -> (String, Vec<String>) {
        let stdout = self.stdout_of(&[
            "confirm",
            pattern_id,
            "--title",
            title,
            "--from",
            TestFixtures::WINDOW_START,
        ]);
        let mut ids = uuids_in(&stdout).into_iter().map(|id| id.to_string());
        let series_id = ids.next().expect("series id in output");
        (series_id, ids.collect())
    }
}

/// Every UUID in `text`, in order of appearance, without duplicates.
pub fn uuids_in(text: &str) -> Vec<Uuid> {
    let mut found: Vec<Uuid> = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    while start + 36 <= bytes.len() {
        if let Some(candidate) = text.get(start..start + 36) {
            if let Ok(id) = Uuid::parse_str(candidate) {
                if !found.contains(&id) {
                    found.push(id);
                }
                start += 36;
                continue;
            }
        }
        start += 1;
    }
    found
}

/// Common test fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Generation window start used by every test; far enough ahead of the real clock
    pub const WINDOW_START: &'static str = "2030-03-01";

    /// Weekly Monday 10:00 UTC for an hour, four times
    pub fn weekly_pattern_args(resource: &'static str) -> Vec<&'static str> {
        vec![
            "--resource", resource,
            "--type", "weekly",
            "--days", "mon",
            "--time", "10:00",
            "--duration", "60",
            "--start", "2030-03-04",
            "--count", "4",
            "--timezone", "UTC",
        ]
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    /// Predicate to check for error messages
    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error").or(predicate::str::contains("error"))
    }

    pub fn succeeded() -> impl Predicate<str> {
        predicate::str::contains("✓")
    }
}
