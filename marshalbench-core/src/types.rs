// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Following the "Newtype" pattern in Rust to ensure valid state by construction.
//! All types validate their invariants at creation time.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Minimum number of outer rounds in a run.
const MIN_OUTER_ROUNDS: u64 = 1;
/// Maximum number of outer rounds in a run.
const MAX_OUTER_ROUNDS: u64 = 100_000;

/// Validated test name, as shown in the report.
/// Must be non-empty, ASCII alphanumeric with underscores, max 128 chars.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TestName(String);

impl TestName {
    /// Create a new TestName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, HardValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "test_name",
                value: name,
                reason: "Test name cannot be empty".to_string(),
            });
        }

        if name.len() > 128 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "test_name",
                value: name.clone(),
                reason: format!("Test name too long: {} chars (max 128)", name.len()),
            });
        }

        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(HardValidationError::InvalidFieldValue {
                field: "test_name",
                value: name,
                reason: "Test name must contain only ASCII alphanumeric characters and underscores"
                    .to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TestName {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TestName> for String {
    fn from(name: TestName) -> Self {
        name.0
    }
}

/// Report grouping label, e.g. "String tests (length 10)".
/// Free text, but never empty and never containing a line break.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// Create a new Category with validation.
    pub fn new(label: impl Into<String>) -> Result<Self, HardValidationError> {
        let label = label.into();

        if label.trim().is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "category",
                value: label,
                reason: "Category cannot be empty".to_string(),
            });
        }

        if label.contains(['\n', '\r']) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "category",
                value: label.escape_debug().to_string(),
                reason: "Category must fit on a single report line".to_string(),
            });
        }

        Ok(Self(label))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Category {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

/// Number of elementary iterations one invocation performed. Always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IterationCount(NonZeroU64);

impl IterationCount {
    /// Returns `None` for a zero count.
    pub fn new(count: u64) -> Option<Self> {
        NonZeroU64::new(count).map(Self)
    }

    /// Get the count.
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for IterationCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated number of outer rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct OuterRounds(u64);

impl OuterRounds {
    /// Create a new OuterRounds with bounds validation.
    pub fn new(rounds: u64) -> Result<Self, HardValidationError> {
        if !(MIN_OUTER_ROUNDS..=MAX_OUTER_ROUNDS).contains(&rounds) {
            return Err(HardValidationError::OutOfBounds {
                field: "outer_rounds",
                value: rounds,
                min: MIN_OUTER_ROUNDS,
                max: MAX_OUTER_ROUNDS,
            });
        }
        Ok(Self(rounds))
    }

    /// Get the number of rounds.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Default for OuterRounds {
    fn default() -> Self {
        Self(100)
    }
}

impl fmt::Display for OuterRounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for OuterRounds {
    type Error = HardValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OuterRounds> for u64 {
    fn from(rounds: OuterRounds) -> Self {
        rounds.0
    }
}
