//! Report JSON schema definitions.
//!
//! This module defines the structure of the report files we write to disk.
//! Schema is versioned to allow future evolution.

use crate::model::LineKind;
use serde::{Deserialize, Serialize};

/// Top-level report written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version for compatibility checking
    pub version: String,

    /// Trace the report was computed from
    pub source: String,

    /// Last sample time of the normalized trace
    pub end_time: f64,

    /// Window the statistics were computed for
    pub window: WindowReport,

    /// Statistics of the whole trace
    pub totals: StatisticReport,

    /// Per-owner breakdown, in declaration order
    pub owners: Vec<OwnerReport>,

    /// Timestamp when the report was generated
    pub generated_at: String,
}

/// Queried window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    pub start: f64,
    pub end: f64,

    /// Length actually covered, after clipping at the first sample
    pub length: f64,
}

/// Read-out of one statistics node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatisticReport {
    /// Active time inside the window
    pub total_time: f64,

    /// Active time over the whole trace
    pub trace_time: f64,

    /// `total_time / window length`
    pub load: f64,

    /// Activations that touched the window
    pub count: u64,

    pub min: f64,
    pub avg: f64,
    pub max: f64,

    /// Inter-arrival period bounds (ISR lines only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_period: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_period: Option<f64>,
}

/// One owner (CPU) and its sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerReport {
    pub id: u32,
    pub name: String,
    pub clocks_per_sec: u64,
    pub mem_clocks_per_sec: u64,
    pub stats: StatisticReport,
    pub sections: Vec<SectionReport>,
}

/// All lines of one kind on one owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionReport {
    pub kind: LineKind,
    pub stats: StatisticReport,
    pub lines: Vec<LineReport>,
}

/// One line with its statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineReport {
    pub id: i64,
    pub name: String,
    pub sample_count: usize,

    /// Validity window; `None` for an unbounded side
    #[serde(default)]
    pub created: Option<f64>,
    #[serde(default)]
    pub deleted: Option<f64>,

    pub max_sample_value: f64,
    pub max_sample_duration: f64,
    pub stats: StatisticReport,
}

impl Report {
    /// Every line of the report with its owner name and kind
    pub fn lines(&self) -> impl Iterator<Item = (&str, LineKind, &LineReport)> {
        self.owners.iter().flat_map(|owner| {
            owner.sections.iter().flat_map(move |section| {
                section
                    .lines
                    .iter()
                    .map(move |line| (owner.name.as_str(), section.kind, line))
            })
        })
    }

    pub fn line_count(&self) -> usize {
        self.lines().count()
    }
}
