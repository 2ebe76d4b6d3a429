// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Marshalbench Core Library
//!
//! Shared building blocks for the marshalbench harness: strongly typed errors,
//! validated configuration, and the static test registry that turns
//! `test_`-prefixed strategy methods into uniform, invocable descriptors.

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigLoader, RunnerConfig, StrategyConfig};
pub use error::{BenchError, BenchResult, BoundaryFault, HardValidationError};
pub use registry::{
    discover, discover_with, retag, Catalog, TestDescriptor, TestHolder, TestMethod,
    TestRegistry, TEST_PREFIX,
};
pub use types::{Category, IterationCount, OuterRounds, TestName};
