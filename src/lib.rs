//! RTOS Trace Studio
//!
//! Ingestion, timeline reconstruction and windowed statistics for
//! execution traces of instrumented embedded runtimes.
//!
//! This crate provides the core implementation for the
//! `rtos-trace` CLI tool.
//!
//! ## Getting Started
//!
//! ```ignore
//! use rtos_trace_studio::aggregator::StatisticsTree;
//! use rtos_trace_studio::parser::{parse_file, ParseOptions};
//!
//! let model = parse_file("run.trace", &ParseOptions::default())?;
//! let mut tree = StatisticsTree::build(&model);
//! tree.compute(&model, 0.0, model.end_time())?;
//! println!("load: {}", tree.root().load());
//! ```

pub mod aggregator;
pub mod commands;
pub mod model;
pub mod output;
pub mod parser;
pub mod utils;
