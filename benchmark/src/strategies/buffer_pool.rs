// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Reusable scratch buffers for string strategies.

use tracing::debug;

/// Scratch buffers owned by one strategy holder and reused across iterations.
///
/// `capacity` is in bytes; the UTF-16 buffer holds `capacity / 2` units.
#[derive(Debug)]
pub struct BufferPool {
    bytes: Vec<u8>,
    units: Vec<u16>,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            units: vec![0; capacity / 2],
        }
    }

    /// Capacity of the byte buffer.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// At least `len` scratch bytes. Grows the buffer when it is too small.
    pub fn bytes(&mut self, len: usize) -> &mut [u8] {
        if self.bytes.len() < len {
            debug!(from = self.bytes.len(), to = len, "Growing byte scratch buffer");
            self.bytes.resize(len, 0);
        }
        &mut self.bytes[..len]
    }

    /// The whole UTF-16 scratch buffer, at its fixed size.
    pub fn units(&mut self) -> &mut [u16] {
        &mut self.units
    }
}
