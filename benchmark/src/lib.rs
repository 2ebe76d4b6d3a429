// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Marshalbench Benchmarking Framework
//!
//! Measures the per-call cost of marshaling strategies across a C ABI
//! boundary and reports the median of each.
//!
//! # Pipeline
//!
//! - **Catalog**: strategy holders are discovered into uniform descriptors
//! - **Runner**: every descriptor runs once per outer round, round-major
//! - **Report**: medians grouped by category; the primary tier goes to the
//!   console, everything goes to the result file
//!
//! # Data Output
//!
//! Besides the text report, a JSON summary can be written for tooling.

pub mod clock;
pub mod harness;
pub mod metrics;
pub mod reporter;
pub mod strategies;

pub use clock::{pin_to_cpu, Clock, CycleClock, PinError, ScriptedClock};
pub use harness::BenchmarkRunner;
pub use metrics::{
    sort_and_get_median, AggregatedRecord, BenchmarkReport, BenchmarkResult, SampleSeries,
    SystemInfo, Tier,
};
pub use reporter::{JsonReporter, ReportBuilder, TextReport, REPORT_HEADER};
pub use strategies::build_catalog;
