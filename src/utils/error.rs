//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while ingesting a trace
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to open trace file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read trace input: {0}")]
    Read(#[from] std::io::Error),

    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: unknown entity kind ordinal {ordinal}")]
    UnknownEntityKind { line: usize, ordinal: String },

    #[error("line {line}: unknown description kind ordinal {ordinal}")]
    UnknownDescriptionKind { line: usize, ordinal: String },

    #[error("line {line}: {command} is missing argument <{argument}>")]
    MissingArgument {
        line: usize,
        command: &'static str,
        argument: &'static str,
    },

    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    #[error("line {line}: unexpected trailing tokens after {command}: '{extra}'")]
    TrailingTokens {
        line: usize,
        command: &'static str,
        extra: String,
    },

    #[error("line {line}: CRE port form expects 2 or 4 extra arguments, found {found}")]
    InvalidPortForm { line: usize, found: usize },

    #[error("Ingestion cancelled before line {line}")]
    Cancelled { line: usize },

    #[error("Background ingestion thread panicked")]
    WorkerPanicked,
}

impl ParseError {
    /// Input line the error refers to, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::UnknownCommand { line, .. }
            | Self::UnknownEntityKind { line, .. }
            | Self::UnknownDescriptionKind { line, .. }
            | Self::MissingArgument { line, .. }
            | Self::InvalidNumber { line, .. }
            | Self::TrailingTokens { line, .. }
            | Self::InvalidPortForm { line, .. }
            | Self::Cancelled { line } => Some(*line),
            Self::Open { .. } | Self::Read(_) | Self::WorkerPanicked => None,
        }
    }

    /// True for failures of the underlying input rather than its content
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::Read(_))
    }
}

/// Errors that can occur when querying windowed statistics
#[derive(Error, Debug, PartialEq)]
pub enum QueryError {
    #[error("Statistics window [{start}, {end}) is empty")]
    EmptyWindow { start: f64, end: f64 },

    #[error("Statistics window bound is not a finite number")]
    InvalidWindow,
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Unsupported report version {found} (expected {expected})")]
    UnsupportedVersion { found: String, expected: String },
}
