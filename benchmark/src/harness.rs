// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchmark runner.
//!
//! Runs every descriptor once per outer round, round-major, so slow drift in
//! machine state (frequency scaling, cache warmth) spreads over all tests
//! instead of skewing whichever one happened to run during it.

use marshalbench_core::{
    BenchResult, Catalog, IterationCount, OuterRounds, RunnerConfig, TestDescriptor,
};
use tracing::{debug, error, info, trace};

use crate::clock::{Clock, CycleClock};
use crate::metrics::{AggregatedRecord, SampleSeries};

/// Interleaved runner for a descriptor catalog.
pub struct BenchmarkRunner<C = CycleClock> {
    clock: C,
    /// Number of timed passes over the whole catalog
    outer_rounds: u64,
    /// Number of untimed passes before the first timed one
    warmup_rounds: u64,
}

impl BenchmarkRunner<CycleClock> {
    /// Create a runner on the hardware clock with default settings.
    pub fn new() -> Self {
        Self::with_clock(CycleClock::new())
    }
}

impl Default for BenchmarkRunner<CycleClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> BenchmarkRunner<C> {
    /// Create a runner reading timestamps from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            outer_rounds: OuterRounds::default().get(),
            warmup_rounds: 0,
        }
    }

    /// Set the number of outer rounds.
    pub fn outer_rounds(mut self, rounds: OuterRounds) -> Self {
        self.outer_rounds = rounds.get();
        self
    }

    /// Set the number of untimed warmup rounds.
    pub fn warmup(mut self, rounds: u64) -> Self {
        self.warmup_rounds = rounds;
        self
    }

    /// Apply the runner section of a validated configuration.
    pub fn configure(self, config: &RunnerConfig) -> Self {
        self.outer_rounds(config.outer_rounds)
            .warmup(config.warmup_rounds)
    }

    /// Measure every descriptor in `catalog`.
    ///
    /// Each timed invocation records `elapsed / iterations` as one sample. The
    /// first failing invocation aborts the run and no records are returned.
    pub fn run(&self, catalog: Catalog) -> BenchResult<Vec<AggregatedRecord>> {
        let mut descriptors = catalog.into_descriptors();
        let rounds = self.outer_rounds;

        info!(
            tests = descriptors.len(),
            outer_rounds = rounds,
            warmup_rounds = self.warmup_rounds,
            "Starting benchmark run"
        );

        for round in 0..self.warmup_rounds {
            trace!(round, "Warmup round");
            for descriptor in &mut descriptors {
                Self::checked(descriptor, round, warmup_invoke)?;
            }
        }

        let mut series: Vec<SampleSeries> = descriptors
            .iter()
            .map(|_| SampleSeries::with_capacity(rounds as usize))
            .collect();

        for round in 0..rounds {
            for (descriptor, series) in descriptors.iter_mut().zip(&mut series) {
                let start = self.clock.now();
                let outcome = descriptor.invoke();
                let end = self.clock.now();

                let iterations = Self::checked(descriptor, round, |_| outcome)?;
                series.record(self.clock.elapsed(start, end), iterations.get());
            }
            trace!(round, "Completed outer round");
        }

        let records: Vec<AggregatedRecord> = descriptors
            .into_iter()
            .zip(series)
            .map(|(descriptor, series)| AggregatedRecord {
                name: descriptor.name().clone(),
                category: descriptor.category().cloned(),
                is_primary: descriptor.is_primary(),
                series,
            })
            .collect();

        info!(records = records.len(), "Benchmark run complete");
        Ok(records)
    }

    /// Run `invoke` and log the failure, if any, before handing it back.
    fn checked<T>(
        descriptor: &mut TestDescriptor,
        round: u64,
        invoke: impl FnOnce(&mut TestDescriptor) -> BenchResult<T>,
    ) -> BenchResult<T> {
        invoke(&mut *descriptor).inspect_err(|e| {
            error!(
                test = %descriptor.name(),
                round,
                error = %e,
                "Aborting benchmark run"
            );
        })
    }
}

fn warmup_invoke(descriptor: &mut TestDescriptor) -> BenchResult<IterationCount> {
    let count = descriptor.invoke()?;
    debug!(test = %descriptor.name(), iterations = count.get(), "Warmup invocation");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ScriptedClock;
    use marshalbench_core::{BenchError, TestName};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn counting(name: &str, log: &Rc<RefCell<Vec<String>>>, count: u64) -> TestDescriptor {
        let log = Rc::clone(log);
        let label = name.to_string();
        TestDescriptor::new(TestName::new(name).unwrap(), move || {
            log.borrow_mut().push(label.clone());
            Ok(count)
        })
    }

    #[test]
    fn test_round_major_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut catalog = Catalog::new();
        catalog.push(counting("a", &log, 1));
        catalog.push(counting("b", &log, 1));

        let runner = BenchmarkRunner::with_clock(ScriptedClock::stepping(1, 6))
            .outer_rounds(OuterRounds::new(3).unwrap());
        let records = runner.run(catalog).unwrap();

        assert_eq!(*log.borrow(), vec!["a", "b", "a", "b", "a", "b"]);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.series.len() == 3));
    }

    #[test]
    fn test_samples_are_per_iteration() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut catalog = Catalog::new();
        catalog.push(counting("ten", &log, 10));

        // Readings: (0, 100), (200, 500)
        let runner = BenchmarkRunner::with_clock(ScriptedClock::new([0, 100, 200, 500]))
            .outer_rounds(OuterRounds::new(2).unwrap());
        let records = runner.run(catalog).unwrap();

        assert_eq!(records[0].series.times(), &[10.0, 30.0]);
        assert_eq!(records[0].series.total_time(), 400);
        assert_eq!(records[0].series.total_iterations(), 20);
    }

    #[test]
    fn test_warmup_is_untimed() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut catalog = Catalog::new();
        catalog.push(counting("a", &log, 1));

        let clock = ScriptedClock::stepping(5, 2);
        let runner = BenchmarkRunner::with_clock(clock)
            .outer_rounds(OuterRounds::new(2).unwrap())
            .warmup(3);
        let records = runner.run(catalog).unwrap();

        assert_eq!(log.borrow().len(), 5);
        assert_eq!(records[0].series.len(), 2);
    }

    #[test]
    fn test_zero_count_aborts_before_recording() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut catalog = Catalog::new();
        catalog.push(counting("good", &log, 1));
        catalog.push(counting("zero", &log, 0));
        catalog.push(counting("never", &log, 1));

        let runner = BenchmarkRunner::with_clock(ScriptedClock::stepping(1, 10));
        let err = runner.run(catalog).unwrap_err();

        assert!(matches!(err, BenchError::InvalidTestResult { ref name, returned: 0 } if name == "zero"));
        assert_eq!(*log.borrow(), vec!["good", "zero"]);
    }

    #[test]
    fn test_boundary_fault_aborts() {
        let mut catalog = Catalog::new();
        catalog.push(TestDescriptor::new(TestName::new("faulty").unwrap(), || {
            Err(marshalbench_core::BoundaryFault::CallbackNotSet {
                entry_point: "mb_invoke_stored_static_callback",
            })
        }));

        let runner = BenchmarkRunner::with_clock(ScriptedClock::stepping(1, 2));
        let err = runner.run(catalog).unwrap_err();
        assert!(err.is_measurement_fault());
    }

    #[test]
    fn test_configure_from_runner_config() {
        let config = marshalbench_core::Config::default();
        let runner = BenchmarkRunner::with_clock(ScriptedClock::default()).configure(&config.runner);
        assert_eq!(runner.outer_rounds, 100);
        assert_eq!(runner.warmup_rounds, 0);
    }
}
