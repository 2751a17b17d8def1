/// Black-box tests for the rebook binary.
///
/// Every test runs against its own temporary database and drives the binary
/// the way a user would, asserting on exit status and output.
use predicates::prelude::*;

mod helpers;
use helpers::{assertions, CliTestHarness, TestFixtures};

const FROM: &str = TestFixtures::WINDOW_START;

#[test]
fn test_cli_help_and_version() {
    let harness = CliTestHarness::new();

    harness
        .run_success(&["--help"])
        .stdout(predicate::str::contains("Recurring appointment"));

    harness
        .run_success(&["--version"])
        .stdout(predicate::str::contains("rebook"));

    harness
        .run_failure(&["invalid-command"])
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_pattern_create_and_show() {
    let harness = CliTestHarness::new();
    let pattern_id = harness.create_pattern(&TestFixtures::weekly_pattern_args("barber-1"));

    harness
        .run_success(&["pattern", "show", &pattern_id])
        .stdout(predicate::str::contains("barber-1"))
        .stdout(predicate::str::contains("weekly"))
        .stdout(predicate::str::contains("FREQ=WEEKLY"));

    harness
        .run_failure(&["pattern", "show", "not-a-uuid"])
        .stderr(assertions::has_error());
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let harness = CliTestHarness::new();

    // weekly without any day of week
    harness
        .run_failure(&[
            "pattern", "create",
            "--resource", "barber-1",
            "--type", "weekly",
            "--time", "10:00",
            "--start", "2030-03-04",
            "--count", "4",
            "--timezone", "UTC",
        ])
        .stderr(predicate::str::contains("day of week"));

    harness
        .run_failure(&[
            "pattern", "create",
            "--resource", "barber-1",
            "--days", "mon",
            "--time", "10:00",
            "--start", "2030-03-04",
            "--count", "4",
            "--timezone", "Mars/Olympus",
        ])
        .stderr(predicate::str::contains("Invalid timezone"));

    harness
        .run_failure(&[
            "pattern", "create",
            "--resource", "barber-1",
            "--type", "fortnightly",
            "--time", "10:00",
        ])
        .stderr(assertions::has_error());
}

#[test]
fn test_preview_lists_occurrences() {
    let harness = CliTestHarness::new();
    let pattern_id = harness.create_pattern(&TestFixtures::weekly_pattern_args("barber-1"));

    harness
        .run_success(&["preview", &pattern_id, "--from", FROM])
        .stdout(predicate::str::contains("2030-03-04 10:00"))
        .stdout(predicate::str::contains("2030-03-25 10:00"))
        .stdout(predicate::str::contains("4 bookable, 0 with conflicts, 0 excluded"));

    harness
        .run_success(&["preview", &pattern_id, "--from", FROM, "--max", "2"])
        .stdout(predicate::str::contains("2030-03-11 10:00"))
        .stdout(predicate::str::contains("2030-03-18").not());
}

#[test]
fn test_series_lifecycle_workflow() {
    let harness = CliTestHarness::new();
    let pattern_id = harness.create_pattern(&TestFixtures::weekly_pattern_args("barber-1"));
    let (series_id, appointments) = harness.confirm(&pattern_id, "Haircuts");
    assert_eq!(appointments.len(), 4);

    harness
        .run_success(&["series", "list"])
        .stdout(predicate::str::contains("Haircuts"))
        .stdout(predicate::str::contains("active"));

    harness
        .run_success(&["series", "pause", &series_id])
        .stdout(assertions::succeeded());
    harness
        .run_failure(&["series", "pause", &series_id])
        .stderr(predicate::str::contains("Cannot pause"));
    harness
        .run_success(&["series", "list", "--status", "paused"])
        .stdout(predicate::str::contains("Haircuts"));
    harness
        .run_success(&["series", "resume", &series_id])
        .stdout(predicate::str::contains("Resumed"));

    harness
        .run_success(&["appointment", "complete", &appointments[0]])
        .stdout(predicate::str::contains("1 succeeded, 0 failed"));

    harness
        .run_success(&["series", "stats", &series_id[..8]])
        .stdout(predicate::str::contains("in_progress"))
        .stdout(predicate::str::contains("25.0%"));

    harness
        .run_success(&["series", "cancel", &series_id, "--yes"])
        .stdout(predicate::str::contains("1 completed, 3 cancelled"));
    harness
        .run_failure(&["series", "pause", &series_id])
        .stderr(predicate::str::contains("cancelled"));
}

#[test]
fn test_conflicting_series_reports_next_open_slot() {
    let harness = CliTestHarness::new();
    let first = harness.create_pattern(&TestFixtures::weekly_pattern_args("barber-1"));
    harness.confirm(&first, "First");

    let second = harness.create_pattern(&TestFixtures::weekly_pattern_args("barber-1"));
    harness
        .run_success(&["preview", &second, "--from", FROM])
        .stdout(predicate::str::contains("conflict"))
        .stdout(predicate::str::contains("next open: 11:00"));

    harness
        .run_failure(&["confirm", &second, "--title", "Second", "--accept", "1", "--from", FROM])
        .stdout(predicate::str::contains("next open slot 11:00"))
        .stderr(predicate::str::contains("nothing was saved"));

    // a different resource is free at the same time
    let other = harness.create_pattern(&TestFixtures::weekly_pattern_args("barber-2"));
    let (_, appointments) = harness.confirm(&other, "Other chair");
    assert_eq!(appointments.len(), 4);
}

#[test]
fn test_reschedule_remaining_appointments() {
    let harness = CliTestHarness::new();
    let pattern_id = harness.create_pattern(&TestFixtures::weekly_pattern_args("barber-1"));
    let (series_id, appointments) = harness.confirm(&pattern_id, "Moving");

    harness
        .run_success(&[
            "appointment", "reschedule", &appointments[2],
            "--shift-days", "1",
            "--time", "15:00",
            "--remaining",
        ])
        .stdout(predicate::str::contains("2 succeeded, 0 failed"));

    harness
        .run_success(&["series", "show", &series_id])
        .stdout(predicate::str::contains("2030-03-19 15:00"))
        .stdout(predicate::str::contains("2030-03-26 15:00"));

    // an exact time only applies to one appointment
    harness
        .run_failure(&[
            "appointment", "reschedule", &appointments[0], &appointments[1],
            "--at", "2030-03-05 09:00",
        ])
        .stderr(predicate::str::contains("single appointment"));
}

#[test]
fn test_booking_blocks_reschedule() {
    let harness = CliTestHarness::new();
    let pattern_id = harness.create_pattern(&TestFixtures::weekly_pattern_args("barber-1"));
    let (_, appointments) = harness.confirm(&pattern_id, "Blocked");

    harness
        .run_success(&[
            "booking", "add",
            "--resource", "barber-1",
            "--start", "2030-03-05 10:00",
            "--duration", "30",
        ])
        .stdout(assertions::succeeded());

    harness
        .run_failure(&[
            "booking", "add",
            "--resource", "barber-1",
            "--start", "2030-03-04 10:30",
        ])
        .stderr(predicate::str::contains("overlaps"));

    harness
        .run_failure(&["appointment", "reschedule", &appointments[0], "--shift-days", "1"])
        .stdout(predicate::str::contains("conflicts with 1 existing booking"));
}

#[test]
fn test_payments() {
    let harness = CliTestHarness::new();
    let pattern_id = harness.create_pattern(&TestFixtures::weekly_pattern_args("barber-1"));
    let series_id = {
        let stdout = harness.stdout_of(&[
            "confirm", &pattern_id,
            "--title", "Paid",
            "--price", "100",
            "--payment-type", "series_upfront",
            "--from", FROM,
        ]);
        helpers::uuids_in(&stdout)[0].to_string()
    };

    harness
        .run_success(&["series", "pay", &series_id, "40"])
        .stdout(predicate::str::contains("40.00 paid, status partial"));
    harness
        .run_success(&["series", "pay", &series_id, "60.00"])
        .stdout(predicate::str::contains("status paid"));
    harness
        .run_success(&["series", "stats", &series_id])
        .stdout(predicate::str::contains("0.00"));

    harness
        .run_success(&["series", "refund", &series_id, "--yes"])
        .stdout(predicate::str::contains("Refunded"));
    harness
        .run_failure(&["series", "pay", &series_id, "10"])
        .stderr(predicate::str::contains("refunded"));
    harness
        .run_failure(&["series", "pay", &series_id, "ten"])
        .stderr(predicate::str::contains("Invalid amount"));
}
