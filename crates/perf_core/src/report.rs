//! Benchmark report generation.
//!
//! Results are grouped by operation label, groups appearing in the order
//! their first result was logged. Within a group, rows are sorted by average
//! time, fastest first.
//!
//! # Example
//!
//! ```rust
//! use perf_core::report::BenchmarkReport;
//!
//! let report = BenchmarkReport::from_results(&[]);
//! assert_eq!(report.render(), "No benchmark results recorded.\n");
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Write as _;

use crate::error::PerfResult;
use crate::runner::BenchmarkResult;

/// One row of a report table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub subject: String,
    pub average_time: f64,
    pub total_duration: f64,
    pub iterations: usize,
}

impl From<&BenchmarkResult> for ReportRow {
    fn from(result: &BenchmarkResult) -> Self {
        Self {
            subject: result.subject.clone(),
            average_time: result.average_time,
            total_duration: result.total_duration,
            iterations: result.iterations,
        }
    }
}

/// All results for one operation label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGroup {
    pub operation_label: String,
    pub rows: Vec<ReportRow>,
}

impl ReportGroup {
    /// Subject of the fastest row, if any.
    pub fn fastest(&self) -> Option<&str> {
        self.rows.first().map(|row| row.subject.as_str())
    }
}

/// Report over a benchmark log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    pub groups: Vec<ReportGroup>,
}

impl BenchmarkReport {
    pub fn from_results(results: &[BenchmarkResult]) -> Self {
        let mut groups: Vec<ReportGroup> = Vec::new();

        for result in results {
            match groups
                .iter_mut()
                .find(|group| group.operation_label == result.operation_label)
            {
                Some(group) => group.rows.push(ReportRow::from(result)),
                None => groups.push(ReportGroup {
                    operation_label: result.operation_label.clone(),
                    rows: vec![ReportRow::from(result)],
                }),
            }
        }

        for group in &mut groups {
            group.rows.sort_by(|a, b| {
                a.average_time
                    .partial_cmp(&b.average_time)
                    .unwrap_or(Ordering::Equal)
            });
        }

        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Render one table per operation label.
    pub fn render(&self) -> String {
        if self.groups.is_empty() {
            return "No benchmark results recorded.\n".to_string();
        }

        let mut out = String::new();
        for (index, group) in self.groups.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            render_group(&mut out, group);
        }
        out
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> PerfResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn render_group(out: &mut String, group: &ReportGroup) {
    let subject_width = group
        .rows
        .iter()
        .map(|row| row.subject.chars().count())
        .chain(std::iter::once("Subject".len()))
        .max()
        .unwrap_or(0);

    // Writing into a String cannot fail.
    let _ = writeln!(out, "Benchmark: {}", group.operation_label);
    let _ = writeln!(
        out,
        "| {:<subject_width$} | {:>12} | {:>12} | {:>10} |",
        "Subject", "Average (ms)", "Total (ms)", "Iterations"
    );
    let _ = writeln!(
        out,
        "|{}|{}|{}|{}|",
        "-".repeat(subject_width + 2),
        "-".repeat(14),
        "-".repeat(14),
        "-".repeat(12)
    );
    for row in &group.rows {
        let _ = writeln!(
            out,
            "| {:<subject_width$} | {:>12.3} | {:>12.3} | {:>10} |",
            row.subject, row.average_time, row.total_duration, row.iterations
        );
    }
}
