//! Error types for orchestrator setup.
//!
//! Once a run is underway no error crosses the channel as an `Err`;
//! everything the consumer needs to know arrives as an event. These
//! types cover the pre-run checks only.

use std::io;

use thiserror::Error;

/// Errors from pre-run validation.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// A required external tool is not on PATH (or the configured path
    /// does not exist).
    #[error("required tool not found: {tool} ({path})")]
    ToolNotFound { tool: &'static str, path: String },

    /// A tool was found but could not be executed.
    #[error("failed to run {tool}: {source}")]
    ToolFailed {
        tool: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Result type for orchestrator setup operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
