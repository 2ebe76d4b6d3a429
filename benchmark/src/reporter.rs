// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Text and JSON report generation.
//!
//! The text report has two sections. The primary section is printed to the
//! console; the result file holds the primary section followed by the
//! secondary one, byte for byte.

use std::fs::{self, File};
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use marshalbench_core::{BenchError, BenchResult};

use crate::metrics::{AggregatedRecord, BenchmarkReport};

/// First lines of the primary section.
pub const REPORT_HEADER: &str = "Performance test results (CPU cycles):\n\n";

/// Rendered text report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReport {
    primary: String,
    secondary: String,
}

impl TextReport {
    /// The console section, header included.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// The file-only section.
    pub fn secondary(&self) -> &str {
        &self.secondary
    }

    /// Exact contents of the result file.
    pub fn file_contents(&self) -> String {
        let mut contents = String::with_capacity(self.primary.len() + self.secondary.len());
        contents.push_str(&self.primary);
        contents.push_str(&self.secondary);
        contents
    }

    /// Overwrite `path` with [`file_contents`](Self::file_contents) as UTF-8.
    pub fn write_to(&self, path: impl AsRef<Path>) -> BenchResult<()> {
        let path = path.as_ref();
        fs::write(path, self.file_contents()).map_err(|source| BenchError::ReportWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Groups records by category into the two report sections.
#[derive(Debug)]
pub struct ReportBuilder {
    primary: String,
    secondary: String,
    /// Category of the last emitted line, across both sections.
    last_category: Option<String>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            primary: String::from(REPORT_HEADER),
            secondary: String::new(),
            last_category: None,
        }
    }

    /// Append one record, starting a new category block when its category
    /// differs from the previous record's.
    ///
    /// Blocks are not merged: a category that reappears after another one
    /// gets a second header.
    pub fn push(&mut self, record: &mut AggregatedRecord) -> &mut Self {
        let median = record.median();
        let category = record.category.as_ref().map(|c| c.as_str().to_owned());
        let section = if record.is_primary {
            &mut self.primary
        } else {
            &mut self.secondary
        };

        if category != self.last_category {
            section.push_str(&format!("\n{}:\n", category.as_deref().unwrap_or("")));
            self.last_category = category;
        }
        section.push_str(&format!("{}: {}\n", record.name, median));
        self
    }

    pub fn build(self) -> TextReport {
        TextReport {
            primary: self.primary,
            secondary: self.secondary,
        }
    }

    /// Render all records in order.
    pub fn render(records: &mut [AggregatedRecord]) -> TextReport {
        let mut builder = Self::new();
        for record in records.iter_mut() {
            builder.push(record);
        }
        builder.build()
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON reporter for the run summary.
pub struct JsonReporter {
    path: PathBuf,
}

impl JsonReporter {
    /// Create a reporter writing to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save a report, creating the parent directory if needed.
    pub fn save(&self, report: &BenchmarkReport) -> BenchResult<PathBuf> {
        let to_write_error = |source: std::io::Error| BenchError::ReportWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(to_write_error)?;
        }

        let file = File::create(&self.path).map_err(to_write_error)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)
            .map_err(|e| to_write_error(e.into()))?;
        writer.flush().map_err(to_write_error)?;

        Ok(self.path.clone())
    }

    /// Load a previously saved report.
    pub fn load(path: impl AsRef<Path>) -> BenchResult<BenchmarkReport> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| BenchError::Io {
            context: "opening JSON summary",
            source,
        })?;
        serde_json::from_reader(file).map_err(|e| BenchError::Io {
            context: "parsing JSON summary",
            source: e.into(),
        })
    }
}
