// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Optimisation barrier for values produced inside timed loops.

use std::hint::black_box;

/// Write-only accumulator owned by one strategy holder.
///
/// Every value a strategy produces is folded in through [`black_box`], so the
/// compiler cannot prove the boundary call that produced it is dead. Nothing
/// in a run reads the total back.
#[derive(Debug, Default)]
pub struct Sink {
    total: f64,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, value: f64) {
        self.total = black_box(self.total + value);
    }

    #[inline]
    pub fn add_len(&mut self, len: usize) {
        self.add(len as f64);
    }

    /// Accumulated total. Only meaningful to tests.
    pub fn total(&self) -> f64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_accumulates() {
        let mut sink = Sink::new();
        sink.add(1.5);
        sink.add_len(3);
        assert_eq!(sink.total(), 4.5);
    }
}
