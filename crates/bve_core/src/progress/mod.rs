//! Incremental parsing of ffmpeg's `-progress` stream.
//!
//! The stream is newline-delimited `key=value` pairs. Only two keys
//! matter here: `out_time_ms` (despite the name, the field carries
//! microsecond resolution) and `speed`. Everything else is ignored so
//! new ffmpeg keys never break the parser.

/// Latest parsed progress values for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Processed time position in seconds, monotonically non-decreasing.
    pub processed_secs: f64,
    /// Encoder speed token as reported, e.g. "1.23x".
    pub speed: Option<String>,
}

/// Line-oriented parser over the progress stream of a single job.
#[derive(Debug, Default)]
pub struct ProgressParser {
    processed_secs: f64,
    speed: Option<String>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line of progress output.
    ///
    /// Malformed values and values that would move the time position
    /// backwards are silently dropped; unrecognized keys are ignored.
    pub fn consume_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        if let Some(value) = line.strip_prefix("out_time_ms=") {
            if let Ok(raw) = value.trim().parse::<i64>() {
                // Historical ffmpeg quirk: the "ms" field is microseconds.
                let secs = raw as f64 / 1_000_000.0;
                if secs >= self.processed_secs {
                    self.processed_secs = secs;
                }
            }
        } else if let Some(value) = line.strip_prefix("speed=") {
            let token = value.trim();
            if !token.is_empty() {
                self.speed = Some(token.to_string());
            }
        }
    }

    /// Current parser state.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed_secs: self.processed_secs,
            speed: self.speed.clone(),
        }
    }

    /// Processed time position in seconds.
    pub fn processed_secs(&self) -> f64 {
        self.processed_secs
    }
}
