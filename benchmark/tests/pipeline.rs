// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end tests for the benchmark pipeline.
//!
//! These tests drive catalog discovery, the runner, and both reporters with a
//! scripted clock, so every number in the reports is known in advance.

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use marshalbench_benchmark::{
    build_catalog, BenchmarkReport, BenchmarkRunner, JsonReporter, ReportBuilder, ScriptedClock,
    Tier, REPORT_HEADER,
};
use marshalbench_core::{
    retag, BenchError, Catalog, Config, ConfigLoader, OuterRounds, StrategyConfig, TestDescriptor,
    TestName,
};
use tempfile::TempDir;

fn small_strategies() -> StrategyConfig {
    ConfigLoader::load_string(
        r#"
strategies:
  primary_inner_rounds: 2
  boundary_inner_rounds: 2
  string_repeats: [1]
"#,
    )
    .expect("Failed to load config")
    .strategies
}

fn runner(step: u64, rounds: u64) -> BenchmarkRunner<ScriptedClock> {
    BenchmarkRunner::with_clock(ScriptedClock::stepping(step, 10_000))
        .outer_rounds(OuterRounds::new(rounds).expect("Invalid rounds"))
}

fn single(category: &str, name: &str, log: &Rc<RefCell<Vec<String>>>) -> Catalog {
    let log = Rc::clone(log);
    let label = name.to_string();
    let mut catalog = Catalog::new();
    catalog.push(TestDescriptor::new(
        TestName::new(name).expect("Invalid name"),
        move || {
            log.borrow_mut().push(label.clone());
            Ok(1)
        },
    ));
    retag(catalog, category).expect("Invalid category")
}

/// Full catalog with a scripted clock: every sample is `step / inner rounds`.
#[test]
fn test_full_catalog_run() {
    let catalog = build_catalog(&small_strategies()).expect("Failed to build catalog");
    assert_eq!(catalog.len(), 11 + 15 + 19);

    let mut records = runner(7, 3).run(catalog).expect("Run failed");
    assert_eq!(records.len(), 45);
    for record in &mut records {
        assert_eq!(record.series.len(), 3, "{}", record.name);
        assert_eq!(record.median(), 3.5, "{}", record.name);
    }

    let report = ReportBuilder::render(&mut records);
    assert!(report.primary().starts_with(REPORT_HEADER));
    assert!(report.primary().contains("\nempty_function: 3.5\n"));
    assert!(!report.primary().contains("PInvoke"));

    let secondary = report.secondary();
    let pinvoke = secondary
        .find("\nPInvoke tests:\n")
        .expect("Missing value-type block");
    let strings = secondary
        .find("\nString tests (length 10):\n")
        .expect("Missing string block");
    assert!(pinvoke < strings);
    assert!(secondary.contains("return_string_reuse_buffer_utf16: 3.5\n"));
}

/// Three descriptors, five rounds: 15 invocations, round-major.
#[test]
fn test_invocation_count_and_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut catalog = Catalog::new();
    catalog.append(single("A", "x", &log));
    catalog.append(single("B", "y", &log));
    catalog.append(single("C", "z", &log));

    let records = runner(1, 5).run(catalog).expect("Run failed");

    let log = log.borrow();
    assert_eq!(log.len(), 15);
    for round in log.chunks(3) {
        assert_eq!(round, ["x", "y", "z"]);
    }
    assert!(records.iter().all(|r| r.series.len() == 5));
}

/// A category that reappears gets a second header instead of being merged.
#[test]
fn test_non_contiguous_categories() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut catalog = Catalog::new();
    catalog.append(single("A", "x", &log));
    catalog.append(single("B", "y", &log));
    catalog.append(single("A", "z", &log));

    let mut records = runner(4, 2).run(catalog).expect("Run failed");
    let report = ReportBuilder::render(&mut records);

    assert_eq!(report.primary(), REPORT_HEADER);
    assert_eq!(report.secondary(), "\nA:\nx: 4\n\nB:\ny: 4\n\nA:\nz: 4\n");
}

/// The result file is exactly primary + secondary and is overwritten per run.
#[test]
fn test_result_file_matches_console_plus_secondary() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("perf_test_result.txt");

    for step in [10, 20] {
        let catalog = build_catalog(&small_strategies()).expect("Failed to build catalog");
        let mut records = runner(step, 2).run(catalog).expect("Run failed");
        let report = ReportBuilder::render(&mut records);
        report.write_to(&path).expect("Failed to write report");

        let written = fs::read_to_string(&path).expect("Failed to read report");
        assert_eq!(written, format!("{}{}", report.primary(), report.secondary()));
        assert!(written.contains(&format!("empty_function: {}\n", step / 2)));
    }
}

/// A zero iteration count aborts the run; nothing gets reported.
#[test]
fn test_zero_count_aborts_run() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut catalog = single("A", "x", &log);
    catalog.push(TestDescriptor::new(
        TestName::new("broken").expect("Invalid name"),
        || Ok(0),
    ));

    let err = runner(1, 3).run(catalog).unwrap_err();
    assert!(matches!(err, BenchError::InvalidTestResult { returned: 0, .. }));
    assert!(err.is_measurement_fault());
    assert_eq!(log.borrow().len(), 1);
}

/// JSON summary keeps catalog order, tiers, and per-iteration medians.
#[test]
fn test_json_summary() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let catalog = build_catalog(&small_strategies()).expect("Failed to build catalog");
    let mut records = runner(8, 2).run(catalog).expect("Run failed");

    let report = BenchmarkReport::from_records(&mut records, 2);
    let path = JsonReporter::new(temp_dir.path().join("summary.json"))
        .save(&report)
        .expect("Failed to save summary");

    let loaded = JsonReporter::load(&path).expect("Failed to load summary");
    assert_eq!(loaded.outer_rounds, 2);
    assert_eq!(loaded.results.len(), 45);
    assert_eq!(loaded.results[0].name, "empty_function");
    assert_eq!(loaded.results[0].tier, Tier::Primary);
    assert_eq!(loaded.results[0].category, None);
    assert_eq!(loaded.results[11].tier, Tier::Secondary);
    assert_eq!(loaded.results[11].category.as_deref(), Some("PInvoke tests"));
    assert!(loaded.results.iter().all(|r| r.median == 4.0));
    assert!(loaded.results.iter().all(|r| r.total_iterations == 4));
}

/// Default configuration matches the documented run shape.
#[test]
fn test_default_config_shape() {
    let config = Config::default();
    assert_eq!(config.runner.outer_rounds.get(), 100);
    assert_eq!(config.runner.warmup_rounds, 0);
    assert_eq!(
        config.runner.result_file,
        std::path::PathBuf::from("perf_test_result.txt")
    );
}
