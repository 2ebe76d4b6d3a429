// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Every field is optional and falls back to the defaults the harness has always
//! used. Any present but invalid field is a HardValidationError and the run does
//! not start.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BenchError, BenchResult, HardValidationError};
use crate::types::OuterRounds;

/// Raw runner configuration as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRunnerConfig {
    #[serde(default = "default_outer_rounds")]
    outer_rounds: u64,
    #[serde(default)]
    warmup_rounds: u64,
    #[serde(default = "default_result_file")]
    result_file: String,
    #[serde(default)]
    json_summary: Option<String>,
}

fn default_outer_rounds() -> u64 {
    100
}

fn default_result_file() -> String {
    "perf_test_result.txt".to_string()
}

impl Default for RawRunnerConfig {
    fn default() -> Self {
        Self {
            outer_rounds: default_outer_rounds(),
            warmup_rounds: 0,
            result_file: default_result_file(),
            json_summary: None,
        }
    }
}

/// Raw strategy catalog configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStrategyConfig {
    #[serde(default = "default_primary_inner_rounds")]
    primary_inner_rounds: u64,
    #[serde(default = "default_boundary_inner_rounds")]
    boundary_inner_rounds: u64,
    #[serde(default = "default_string_base")]
    string_base: String,
    #[serde(default = "default_string_repeats")]
    string_repeats: Vec<usize>,
    #[serde(default = "default_buffer_capacity")]
    buffer_capacity: usize,
}

fn default_primary_inner_rounds() -> u64 {
    10_000
}

fn default_boundary_inner_rounds() -> u64 {
    1_000
}

fn default_string_base() -> String {
    "abcde12345".to_string()
}

fn default_string_repeats() -> Vec<usize> {
    vec![1, 100]
}

fn default_buffer_capacity() -> usize {
    16 * 1024
}

impl Default for RawStrategyConfig {
    fn default() -> Self {
        Self {
            primary_inner_rounds: default_primary_inner_rounds(),
            boundary_inner_rounds: default_boundary_inner_rounds(),
            string_base: default_string_base(),
            string_repeats: default_string_repeats(),
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    runner: RawRunnerConfig,
    #[serde(default)]
    strategies: RawStrategyConfig,
}

/// Validated runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub outer_rounds: OuterRounds,
    /// Untimed full passes over every descriptor before round 0.
    pub warmup_rounds: u64,
    pub result_file: PathBuf,
    pub json_summary: Option<PathBuf>,
}

/// Validated strategy catalog configuration.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    /// Inner loop length for the primary (object binding) tier.
    pub primary_inner_rounds: u64,
    /// Inner loop length for raw boundary strategies.
    pub boundary_inner_rounds: u64,
    pub string_base: String,
    /// One string family per entry; the test string is `string_base` repeated.
    pub string_repeats: Vec<usize>,
    /// Size in bytes of each reusable scratch buffer.
    pub buffer_capacity: usize,
}

impl StrategyConfig {
    /// The test strings, one per configured repeat count.
    pub fn test_strings(&self) -> Vec<String> {
        self.string_repeats
            .iter()
            .map(|&repeat| self.string_base.repeat(repeat))
            .collect()
    }

    /// Scale both inner loops down by `divisor`, never below one iteration.
    pub fn scaled_down(mut self, divisor: u64) -> Self {
        let divisor = divisor.max(1);
        self.primary_inner_rounds = (self.primary_inner_rounds / divisor).max(1);
        self.boundary_inner_rounds = (self.boundary_inner_rounds / divisor).max(1);
        self
    }
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub runner: RunnerConfig,
    pub strategies: StrategyConfig,
}

impl Default for Config {
    fn default() -> Self {
        // The raw defaults are valid by construction.
        match ConfigLoader::validate(RawConfig::default()) {
            Ok(config) => config,
            Err(e) => unreachable!("default configuration failed validation: {e}"),
        }
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> BenchResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BenchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BenchError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> BenchResult<Config> {
        if content.trim().is_empty() {
            return Self::validate(RawConfig::default());
        }

        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| BenchError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Self::validate(raw)
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(raw: RawConfig) -> BenchResult<Config> {
        let runner = Self::validate_runner(raw.runner)?;
        let strategies = Self::validate_strategies(raw.strategies)?;
        Ok(Config { runner, strategies })
    }

    /// Validate runner configuration.
    fn validate_runner(raw: RawRunnerConfig) -> BenchResult<RunnerConfig> {
        const MAX_WARMUP_ROUNDS: u64 = 10_000;

        let outer_rounds = OuterRounds::new(raw.outer_rounds)?;

        if raw.warmup_rounds > MAX_WARMUP_ROUNDS {
            return Err(HardValidationError::OutOfBounds {
                field: "warmup_rounds",
                value: raw.warmup_rounds,
                min: 0,
                max: MAX_WARMUP_ROUNDS,
            }
            .into());
        }

        if raw.result_file.trim().is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "result_file",
                value: raw.result_file,
                reason: "Result file path cannot be empty".to_string(),
            }
            .into());
        }

        let json_summary = match raw.json_summary {
            Some(path) if path.trim().is_empty() => {
                return Err(HardValidationError::InvalidFieldValue {
                    field: "json_summary",
                    value: path,
                    reason: "JSON summary path cannot be empty when present".to_string(),
                }
                .into());
            }
            other => other.map(PathBuf::from),
        };

        Ok(RunnerConfig {
            outer_rounds,
            warmup_rounds: raw.warmup_rounds,
            result_file: PathBuf::from(raw.result_file),
            json_summary,
        })
    }

    /// Validate strategy catalog configuration.
    fn validate_strategies(raw: RawStrategyConfig) -> BenchResult<StrategyConfig> {
        const MIN_BUFFER_CAPACITY: usize = 64;

        for (field, value) in [
            ("primary_inner_rounds", raw.primary_inner_rounds),
            ("boundary_inner_rounds", raw.boundary_inner_rounds),
        ] {
            if value == 0 {
                return Err(HardValidationError::InvalidFieldValue {
                    field,
                    value: "0".to_string(),
                    reason: "Inner rounds must be greater than 0".to_string(),
                }
                .into());
            }
        }

        if raw.string_base.is_empty() || !raw.string_base.is_ascii() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "string_base",
                value: raw.string_base,
                reason: "Test string must be non-empty ASCII so every encoding strategy sees the same characters".to_string(),
            }
            .into());
        }

        if raw.string_repeats.is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field: "string_repeats",
                context: "strategies section".to_string(),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for &repeat in &raw.string_repeats {
            if repeat == 0 || !seen.insert(repeat) {
                return Err(HardValidationError::InvalidFieldValue {
                    field: "string_repeats",
                    value: repeat.to_string(),
                    reason: "Repeat counts must be unique and greater than 0".to_string(),
                }
                .into());
            }
        }

        if raw.buffer_capacity < MIN_BUFFER_CAPACITY {
            return Err(HardValidationError::OutOfBounds {
                field: "buffer_capacity",
                value: raw.buffer_capacity as u64,
                min: MIN_BUFFER_CAPACITY as u64,
                max: u64::MAX,
            }
            .into());
        }

        Ok(StrategyConfig {
            primary_inner_rounds: raw.primary_inner_rounds,
            boundary_inner_rounds: raw.boundary_inner_rounds,
            string_base: raw.string_base,
            string_repeats: raw.string_repeats,
            buffer_capacity: raw.buffer_capacity,
        })
    }
}
