use std::process::{Command, Output};

fn run_dispatch(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ride_dispatch"))
        .args(args)
        .env("RUST_LOG", "warn,ride_dispatch=info")
        .output()
        .expect("Failed to execute dispatch binary")
}

/// Test that a seeded headless dispatch runs to completion
#[test]
fn test_headless_dispatch_runs() {
    let output = run_dispatch(&["--seed", "7", "--tick-ms", "0", "--no-map"]);

    assert!(
        output.status.success(),
        "Dispatch failed to run. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("DISPATCH COMPLETE"),
        "Dispatch did not complete properly. stderr: {}",
        stderr
    );
}

/// Test that dispatch statistics are logged
#[test]
fn test_dispatch_statistics_logged() {
    let output = run_dispatch(&["--seed", "11", "--tick-ms", "0", "--no-map"]);
    assert!(output.status.success(), "Dispatch failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    for needle in [
        "Rides requested:",
        "Rides matched:",
        "Riders still queued:",
        "Drivers available:",
        "Trip outcome:",
    ] {
        assert!(stderr.contains(needle), "Missing '{}' statistic", needle);
    }
}

/// Test that the route section reflects congestion flags
#[test]
fn test_congestion_flag_changes_route() {
    let output = run_dispatch(&[
        "--seed",
        "3",
        "--tick-ms",
        "0",
        "--no-map",
        "--from",
        "1",
        "--to",
        "6",
        "--congestion",
        "2:6:3",
    ]);
    assert!(output.status.success(), "Dispatch failed to run");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Shortest route: NUST Hostels -> NUST Gate 2 -> F-10 Markaz"),
        "Unexpected route. stdout: {}",
        stdout
    );
    assert!(stdout.contains("Expected time: 27.0 minutes"));
}

#[test]
fn test_malformed_congestion_is_rejected() {
    let output = run_dispatch(&["--tick-ms", "0", "--no-map", "--congestion", "1-2-3"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("FROM:TO:FACTOR"), "stderr: {}", stderr);
}

#[test]
fn test_congestion_on_missing_road_fails() {
    let output = run_dispatch(&["--tick-ms", "0", "--no-map", "--congestion", "1:6:2"]);
    assert!(!output.status.success());
}
