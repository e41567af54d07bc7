//! Background ingestion on a worker thread.
//!
//! The model only leaves the worker once it has been finalized.

use super::trace_parser::{parse_file, ParseOptions};
use crate::model::TraceModel;
use crate::utils::error::ParseError;
use log::{debug, info};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Handle to an ingestion running on another thread
#[derive(Debug)]
pub struct ParseJob {
    handle: JoinHandle<Result<TraceModel, ParseError>>,
    cancel: Arc<AtomicBool>,
}

impl ParseJob {
    /// Ask the worker to stop before its next input line
    pub fn cancel(&self) {
        debug!("Cancellation requested");
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the finalized model
    ///
    /// # Errors
    /// * `ParseError::Cancelled` - `cancel` was called before the end of input
    /// * `ParseError::WorkerPanicked` - the worker thread panicked
    /// * any error returned by `parse_file`
    pub fn join(self) -> Result<TraceModel, ParseError> {
        self.handle.join().map_err(|_| ParseError::WorkerPanicked)?
    }
}

/// Parse `path` on a new thread
///
/// Any cancel flag already present in `options` is replaced by the job's own.
pub fn spawn_parse(path: impl Into<PathBuf>, options: ParseOptions) -> ParseJob {
    let path = path.into();
    let cancel = Arc::new(AtomicBool::new(false));
    let options = options.with_cancel_flag(Arc::clone(&cancel));

    info!("Starting background ingestion of {}", path.display());
    let handle = thread::spawn(move || parse_file(&path, &options));

    ParseJob { handle, cancel }
}
