// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Timestamp sources for the runner.
//!
//! # Guarantees of [`CycleClock`]
//!
//! - x86_64 reads the TSC with `RDTSCP`, which waits for prior instructions to
//!   retire. Values are monotonic per core; comparing readings taken on
//!   different cores is only meaningful on CPUs with an invariant TSC, so pin
//!   the runner thread with [`pin_to_cpu`] when that matters.
//! - aarch64 reads `CNTVCT_EL0`, a fixed-frequency virtual counter. Units are
//!   counter ticks, not core cycles.
//! - Other targets fall back to nanoseconds since the clock was created.
//!
//! Elapsed values are computed with `wrapping_sub`, so a counter wrap between
//! two readings still yields the right difference.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Instant;

use thiserror::Error;

/// A monotonic timestamp source.
pub trait Clock {
    /// Current timestamp in clock units.
    fn now(&self) -> u64;

    /// Units elapsed between two readings of this clock.
    #[inline]
    fn elapsed(&self, start: u64, end: u64) -> u64 {
        end.wrapping_sub(start)
    }
}

/// Hardware cycle counter with an `Instant` fallback.
#[derive(Debug, Clone, Copy)]
pub struct CycleClock {
    #[cfg_attr(any(target_arch = "x86_64", target_arch = "aarch64"), allow(dead_code))]
    origin: Instant,
}

impl CycleClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Whether readings are real hardware counter values.
    pub const fn is_hardware() -> bool {
        cfg!(any(target_arch = "x86_64", target_arch = "aarch64"))
    }
}

impl Default for CycleClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for CycleClock {
    #[cfg(target_arch = "x86_64")]
    #[inline(always)]
    fn now(&self) -> u64 {
        // SAFETY: RDTSCP is available on every x86_64 CPU this targets.
        unsafe {
            let mut aux = 0u32;
            std::arch::x86_64::__rdtscp(&mut aux)
        }
    }

    #[cfg(target_arch = "aarch64")]
    #[inline(always)]
    fn now(&self) -> u64 {
        let ticks: u64;
        // SAFETY: CNTVCT_EL0 is readable from EL0.
        unsafe {
            std::arch::asm!("mrs {}, cntvct_el0", out(reg) ticks, options(nostack, nomem));
        }
        ticks
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    #[inline(always)]
    fn now(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Clock that replays a fixed sequence of readings.
///
/// Once the script runs out, every further reading repeats the last value.
#[derive(Debug, Default)]
pub struct ScriptedClock {
    readings: RefCell<VecDeque<u64>>,
    last: RefCell<u64>,
}

impl ScriptedClock {
    pub fn new(readings: impl IntoIterator<Item = u64>) -> Self {
        Self {
            readings: RefCell::new(readings.into_iter().collect()),
            last: RefCell::new(0),
        }
    }

    /// A clock where every pair of readings is `step` apart, starting at zero.
    pub fn stepping(step: u64, pairs: usize) -> Self {
        Self::new((0..pairs as u64).flat_map(|i| [i * step * 2, i * step * 2 + step]))
    }

    /// Readings not yet consumed.
    pub fn remaining(&self) -> usize {
        self.readings.borrow().len()
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> u64 {
        let next = self.readings.borrow_mut().pop_front();
        match next {
            Some(value) => {
                *self.last.borrow_mut() = value;
                value
            }
            None => *self.last.borrow(),
        }
    }
}

/// Errors from pinning the runner thread.
#[derive(Debug, Error)]
pub enum PinError {
    #[error("CPU pinning is not supported on this platform")]
    Unsupported,

    #[error("Failed to pin thread to CPU {cpu}: {source}")]
    Affinity {
        cpu: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Pin the calling thread to one CPU so every timestamp comes from the same
/// counter.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), PinError> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    let to_pin_error = |errno: nix::errno::Errno| PinError::Affinity {
        cpu,
        source: errno.into(),
    };

    let mut cpuset = CpuSet::new();
    cpuset.set(cpu).map_err(to_pin_error)?;
    // Pid 0 is the calling thread.
    sched_setaffinity(Pid::from_raw(0), &cpuset).map_err(to_pin_error)?;

    tracing::info!(cpu, "Pinned runner thread");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), PinError> {
    Err(PinError::Unsupported)
}
