//! Report assembly and writers.
//!
//! This module handles:
//! - Building a versioned report from a model and its statistics
//! - JSON reports (write, read back)
//! - Text summaries

pub mod json;
pub mod report;
pub mod schema;
pub mod summary;

// Re-export main functions
pub use json::{read_report, report_to_string, write_report};
pub use report::{build_report, statistic_report};
pub use schema::{LineReport, OwnerReport, Report, SectionReport, StatisticReport, WindowReport};
pub use summary::generate_text_summary;
