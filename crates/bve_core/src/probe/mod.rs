//! Media probing via ffprobe.
//!
//! Probing is best-effort: any failure (tool missing, malformed output,
//! non-positive value) degrades to an absent result. A file with no
//! readable duration simply gets indeterminate progress; it never
//! aborts the batch.

use std::path::Path;
use std::process::Command;

/// Probe queries against a configured ffprobe binary.
#[derive(Debug, Clone)]
pub struct MediaProbe {
    ffprobe: String,
}

impl MediaProbe {
    /// Create a probe using the given ffprobe binary path or name.
    pub fn new(ffprobe: impl Into<String>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    /// Container duration in seconds, if it can be determined and is positive.
    pub fn duration(&self, path: &Path) -> Option<f64> {
        let out = self.query(&[
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
            &path.to_string_lossy(),
        ])?;

        match out.trim().parse::<f64>() {
            Ok(dur) if dur > 0.0 => Some(dur),
            _ => {
                tracing::debug!("no usable duration for {}: {:?}", path.display(), out.trim());
                None
            }
        }
    }

    /// Width and height of the first video stream, if present.
    pub fn resolution(&self, path: &Path) -> (Option<u32>, Option<u32>) {
        let Some(out) = self.query(&[
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
            &path.to_string_lossy(),
        ]) else {
            return (None, None);
        };

        let line = out.trim();
        if let Some((w, h)) = line.split_once('x') {
            let w = w.trim().parse::<u32>().ok().filter(|v| *v > 0);
            let h = h.trim().parse::<u32>().ok().filter(|v| *v > 0);
            return (w, h);
        }
        (None, None)
    }

    /// Run ffprobe with the given arguments, returning stdout on success.
    fn query(&self, args: &[&str]) -> Option<String> {
        let output = match Command::new(&self.ffprobe).args(args).output() {
            Ok(o) => o,
            Err(e) => {
                tracing::debug!("failed to run {}: {}", self.ffprobe, e);
                return None;
            }
        };

        if !output.status.success() {
            tracing::debug!(
                "{} exited with {:?}",
                self.ffprobe,
                output.status.code()
            );
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_degrades_to_none() {
        let probe = MediaProbe::new("/nonexistent/ffprobe-for-test");
        assert_eq!(probe.duration(Path::new("clip.mp4")), None);
        assert_eq!(probe.resolution(Path::new("clip.mp4")), (None, None));
    }

    #[cfg(unix)]
    mod stubbed {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::tempdir;

        fn stub(dir: &Path, body: &str) -> String {
            let path = dir.join("ffprobe");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        #[test]
        fn parses_positive_duration() {
            let dir = tempdir().unwrap();
            let probe = MediaProbe::new(stub(dir.path(), "echo 123.456"));
            let dur = probe.duration(Path::new("clip.mp4")).unwrap();
            assert!((dur - 123.456).abs() < 1e-9);
        }

        #[test]
        fn rejects_non_positive_duration() {
            let dir = tempdir().unwrap();
            let probe = MediaProbe::new(stub(dir.path(), "echo 0.0"));
            assert_eq!(probe.duration(Path::new("clip.mp4")), None);
        }

        #[test]
        fn rejects_malformed_duration() {
            let dir = tempdir().unwrap();
            let probe = MediaProbe::new(stub(dir.path(), "echo N/A"));
            assert_eq!(probe.duration(Path::new("clip.mp4")), None);
        }

        #[test]
        fn parses_resolution() {
            let dir = tempdir().unwrap();
            let probe = MediaProbe::new(stub(dir.path(), "echo 1920x1080"));
            assert_eq!(probe.resolution(Path::new("clip.mp4")), (Some(1920), Some(1080)));
        }

        #[test]
        fn audio_only_file_has_no_resolution() {
            let dir = tempdir().unwrap();
            let probe = MediaProbe::new(stub(dir.path(), "echo"));
            assert_eq!(probe.resolution(Path::new("song.m4a")), (None, None));
        }

        #[test]
        fn failing_tool_degrades_to_none() {
            let dir = tempdir().unwrap();
            let probe = MediaProbe::new(stub(dir.path(), "exit 1"));
            assert_eq!(probe.duration(Path::new("clip.mp4")), None);
        }
    }
}
