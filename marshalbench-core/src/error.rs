// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for marshalbench.
//!
//! Explicit enum error types only. No `Box<dyn Error>` and no `anyhow::Result`
//! inside library code; every failure a run can hit has its own variant.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for a benchmark run.
///
/// Measurement-phase variants abort the whole run. A comparative table with
/// holes in it is worse than no table at all.
#[derive(Debug, Error)]
pub enum BenchError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Measurement Errors - Abort the Run, No Partial Report
    // =========================================================================
    #[error("Test '{name}' returned an invalid iteration count: {returned}")]
    InvalidTestResult { name: String, returned: u64 },

    #[error("Boundary invocation fault in test '{test}': {source}")]
    BoundaryInvocation {
        test: String,
        #[source]
        source: BoundaryFault,
    },

    // =========================================================================
    // Reporting Errors - Measurement Results Are Kept
    // =========================================================================
    #[error("Failed to write report to {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl BenchError {
    /// Whether this error was raised while samples were being collected.
    pub fn is_measurement_fault(&self) -> bool {
        matches!(
            self,
            BenchError::InvalidTestResult { .. } | BenchError::BoundaryInvocation { .. }
        )
    }
}

/// Hard validation errors stop the harness before any measurement starts.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Value out of bounds: {field} = {value} (min: {min}, max: {max})")]
    OutOfBounds {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("Duplicate test name: {name}")]
    DuplicateTestName { name: String },
}

/// A non-success status reported by a native entry point.
///
/// `entry_point` is the exported symbol that reported the fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundaryFault {
    #[error("{entry_point}: null pointer passed across the boundary")]
    NullPointer { entry_point: &'static str },

    #[error("{entry_point}: no callback has been stored")]
    CallbackNotSet { entry_point: &'static str },

    #[error("{entry_point}: the stored callback belongs to another context")]
    CallbackMismatch { entry_point: &'static str },

    #[error("{entry_point}: native allocation failed")]
    AllocationFailed { entry_point: &'static str },

    #[error("{entry_point}: string was not valid in the expected encoding")]
    InvalidEncoding { entry_point: &'static str },
}

/// Result type alias using BenchError.
pub type BenchResult<T> = Result<T, BenchError>;
