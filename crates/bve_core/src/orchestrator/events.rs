//! Event stream between the orchestrator and its consumer.
//!
//! Events are produced exclusively by the orchestrator in FIFO order
//! and consumed exclusively by the front end. Every failure is
//! represented here as a value; nothing is thrown across the boundary.

use std::path::PathBuf;

/// One lifecycle or progress event of a batch run.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeEvent {
    /// A new input file started processing.
    FileStarted {
        /// Input file name (no directory).
        name: String,
        /// Probed duration in seconds, if known.
        total_secs: Option<f64>,
    },
    /// Throttled progress update for the current file.
    FileProgress {
        /// Processed time position in seconds, non-decreasing per file.
        processed_secs: f64,
        /// Probed duration in seconds, if known.
        total_secs: Option<f64>,
        /// Encoder speed token, e.g. "1.23x".
        speed: Option<String>,
    },
    /// The current file's encoder process exited.
    FileFinished {
        /// Exit code was zero.
        ok: bool,
        /// Input file name.
        name: String,
        /// Resolved output path.
        output: PathBuf,
    },
    /// Batch-level progress; `done` counts successful files only.
    OverallProgress { done: usize, total: usize },
    /// Fatal error; the run stops after this event.
    RunError { message: String },
    /// The run was cancelled by the user; terminal.
    Cancelled,
    /// All files were processed (or the run aborted on error); terminal.
    Finished,
}

impl EncodeEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Finished)
    }
}
