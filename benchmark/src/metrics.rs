// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-test samples and the serializable run summary.
//!
//! A sample is the elapsed clock units of one invocation divided by the
//! iteration count it returned, so tests with different inner loop lengths
//! stay comparable.

use chrono::{DateTime, Utc};
use marshalbench_core::{Category, TestName};
use serde::{Deserialize, Serialize};
use sysinfo::System;

/// Median of `values` after sorting them in place.
///
/// Takes the element at index `len / 2`, the upper median for even lengths.
/// An empty slice yields `0.0`.
pub fn sort_and_get_median(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    values.get(values.len() / 2).copied().unwrap_or(0.0)
}

/// Samples and running totals for one descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSeries {
    times: Vec<f64>,
    total_time: u64,
    total_iterations: u64,
}

impl SampleSeries {
    pub fn with_capacity(rounds: usize) -> Self {
        Self {
            times: Vec::with_capacity(rounds),
            ..Self::default()
        }
    }

    /// Record one invocation that took `elapsed` units for `iterations`
    /// iterations.
    pub fn record(&mut self, elapsed: u64, iterations: u64) {
        self.times.push(elapsed as f64 / iterations as f64);
        self.total_time = self.total_time.wrapping_add(elapsed);
        self.total_iterations = self.total_iterations.wrapping_add(iterations);
    }

    /// Per-iteration times in recording order (until the first median call).
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn total_time(&self) -> u64 {
        self.total_time
    }

    pub fn total_iterations(&self) -> u64 {
        self.total_iterations
    }

    /// Sort the samples and return the median. See [`sort_and_get_median`].
    pub fn sort_and_get_median_time(&mut self) -> f64 {
        sort_and_get_median(&mut self.times)
    }

    pub fn min(&self) -> f64 {
        self.times.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    pub fn max(&self) -> f64 {
        self.times.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    /// Whole-run cost per iteration, `total_time / total_iterations`.
    pub fn throughput(&self) -> f64 {
        if self.total_iterations == 0 {
            0.0
        } else {
            self.total_time as f64 / self.total_iterations as f64
        }
    }
}

/// Everything the runner learned about one descriptor.
#[derive(Debug, Clone)]
pub struct AggregatedRecord {
    pub name: TestName,
    pub category: Option<Category>,
    pub is_primary: bool,
    pub series: SampleSeries,
}

impl AggregatedRecord {
    pub fn median(&mut self) -> f64 {
        self.series.sort_and_get_median_time()
    }
}

/// Which report section a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Printed to the console and written to the result file.
    Primary,
    /// Written to the result file only.
    Secondary,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Tier::Primary => "primary",
            Tier::Secondary => "secondary",
        })
    }
}

impl From<bool> for Tier {
    fn from(is_primary: bool) -> Self {
        if is_primary {
            Tier::Primary
        } else {
            Tier::Secondary
        }
    }
}

/// System information captured at benchmark time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system name
    pub os: String,
    /// OS version
    pub os_version: String,
    /// Kernel version (Linux)
    pub kernel_version: Option<String>,
    /// CPU model name
    pub cpu_model: String,
    /// Number of logical CPUs
    pub cpu_cores: usize,
    /// Total system memory in bytes
    pub memory_bytes: u64,
    /// Hostname
    pub hostname: String,
    /// Architecture the clock reads its counter on
    pub arch: String,
    /// Whether timings are hardware counter ticks rather than nanoseconds
    pub hardware_counter: bool,
}

impl SystemInfo {
    /// Collect current system information.
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        Self {
            os: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            cpu_cores: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
            arch: std::env::consts::ARCH.to_string(),
            hardware_counter: crate::clock::CycleClock::is_hardware(),
        }
    }
}

/// Summary of one descriptor in the JSON sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub tier: Tier,
    /// Median clock units per iteration
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub total_time: u64,
    pub total_iterations: u64,
    /// Whole-run clock units per iteration
    pub throughput: f64,
}

impl BenchmarkResult {
    /// Summarise a record. Sorts the record's samples.
    pub fn from_record(record: &mut AggregatedRecord) -> Self {
        Self {
            name: record.name.to_string(),
            category: record.category.as_ref().map(ToString::to_string),
            tier: Tier::from(record.is_primary),
            median: record.median(),
            min: record.series.min(),
            max: record.series.max(),
            total_time: record.series.total_time(),
            total_iterations: record.series.total_iterations(),
            throughput: record.series.throughput(),
        }
    }
}

/// Complete machine-readable run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Suite identifier
    pub benchmark_suite: String,
    /// Harness version
    pub version: String,
    /// Timestamp when the report was built
    pub timestamp: DateTime<Utc>,
    pub system_info: SystemInfo,
    pub outer_rounds: u64,
    /// Results in catalog order
    pub results: Vec<BenchmarkResult>,
}

impl BenchmarkReport {
    pub fn new(outer_rounds: u64) -> Self {
        Self {
            benchmark_suite: "marshalbench".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            system_info: SystemInfo::collect(),
            outer_rounds,
            results: Vec::new(),
        }
    }

    /// Build a report from the runner's records, in order.
    pub fn from_records(records: &mut [AggregatedRecord], outer_rounds: u64) -> Self {
        let mut report = Self::new(outer_rounds);
        report.results = records.iter_mut().map(BenchmarkResult::from_record).collect();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_cases() {
        assert_eq!(sort_and_get_median(&mut []), 0.0);
        assert_eq!(sort_and_get_median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(sort_and_get_median(&mut [4.0, 1.0, 3.0, 2.0]), 3.0);
        assert_eq!(sort_and_get_median(&mut [7.5]), 7.5);
    }

    #[test]
    fn test_median_ignores_input_order() {
        let mut a = [5.0, 9.0, 1.0, 3.0, 7.0];
        let mut b = [1.0, 3.0, 5.0, 7.0, 9.0];
        let mut c = [9.0, 7.0, 5.0, 3.0, 1.0];
        let expected = sort_and_get_median(&mut b);
        assert_eq!(sort_and_get_median(&mut a), expected);
        assert_eq!(sort_and_get_median(&mut c), expected);
    }

    #[test]
    fn test_series_records_per_iteration_time() {
        let mut series = SampleSeries::default();
        series.record(1000, 10);
        series.record(3000, 10);
        series.record(500, 5);

        assert_eq!(series.times(), &[100.0, 300.0, 100.0]);
        assert_eq!(series.total_time(), 4500);
        assert_eq!(series.total_iterations(), 25);
        assert_eq!(series.min(), 100.0);
        assert_eq!(series.max(), 300.0);
        assert!((series.throughput() - 180.0).abs() < 1e-9);
        assert_eq!(series.sort_and_get_median_time(), 100.0);
    }

    #[test]
    fn test_empty_series() {
        let mut series = SampleSeries::default();
        assert_eq!(series.sort_and_get_median_time(), 0.0);
        assert_eq!(series.throughput(), 0.0);
        assert_eq!(series.min(), 0.0);
    }

    #[test]
    fn test_tier_from_flag() {
        assert_eq!(Tier::from(true), Tier::Primary);
        assert_eq!(Tier::from(false).to_string(), "secondary");
    }

    #[test]
    fn test_benchmark_result_serialization() {
        let mut series = SampleSeries::default();
        series.record(40, 4);
        let mut record = AggregatedRecord {
            name: TestName::new("param_vector4_direct").unwrap(),
            category: Some(Category::new("PInvoke tests").unwrap()),
            is_primary: false,
            series,
        };

        let result = BenchmarkResult::from_record(&mut record);
        let json = serde_json::to_string_pretty(&result).unwrap();
        assert!(json.contains("param_vector4_direct"));
        assert!(json.contains("PInvoke tests"));
        assert!(json.contains("\"secondary\""));
        assert_eq!(result.median, 10.0);
    }

    #[test]
    fn test_system_info_collect() {
        let info = SystemInfo::collect();
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
    }
}
