//! Trace text ingestion.
//!
//! This module handles:
//! - Tokenizing protocol lines into commands
//! - Applying commands to the model with an explicit parse state
//! - Finalizing the model once input ends
//! - Running ingestion on a worker thread

pub mod command;
pub mod job;
pub mod trace_parser;

// Re-export main types
pub use command::{Command, PortSpec};
pub use job::{spawn_parse, ParseJob};
pub use trace_parser::{apply_command, parse_file, parse_str, parse_trace, ParseOptions, ParseState};
