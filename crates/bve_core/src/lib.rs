//! BVE Core - backend logic for the batch video encoder.
//!
//! This crate contains all batch/encode logic with zero UI dependencies.
//! The front end (CLI or a GUI) supplies the input list, the encode plan
//! and the output directory, and consumes the event stream produced by
//! the orchestrator.

pub mod config;
pub mod orchestrator;
pub mod output;
pub mod plan;
pub mod probe;
pub mod progress;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
