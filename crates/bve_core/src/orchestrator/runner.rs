//! The batch runner.
//!
//! One worker thread drives the whole batch sequentially, one encoder
//! process at a time. The consumer owns the receive end of the channel
//! and the cancel handle; the runner owns the send end and the child
//! process. Cancellation is cooperative: the flag is checked between
//! progress-line reads, so worst-case latency is one progress interval
//! plus the kill grace.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Settings;
use crate::output::resolve_output_path;
use crate::plan::{apply_resolution_cap, EncodePlan};
use crate::probe::MediaProbe;
use crate::progress::ProgressParser;

use super::cancel::CancelHandle;
use super::errors::{OrchestratorError, OrchestratorResult};
use super::events::EncodeEvent;

/// How one child process run ended.
enum ProcessEnd {
    Exited(ExitStatus),
    Cancelled,
}

/// Sequentially encodes a list of files, emitting [`EncodeEvent`]s.
pub struct EncodeOrchestrator {
    settings: Settings,
    probe: MediaProbe,
}

impl EncodeOrchestrator {
    pub fn new(settings: Settings) -> Self {
        let probe = MediaProbe::new(settings.tools.ffprobe.clone());
        Self { settings, probe }
    }

    /// Check that both external tools can be executed.
    ///
    /// Run this before a batch: a missing encoder mid-run is fatal
    /// anyway, and failing fast gives a much better message.
    pub fn validate_tools(&self) -> OrchestratorResult<()> {
        check_tool("ffmpeg", &self.settings.tools.ffmpeg)?;
        check_tool("ffprobe", &self.settings.tools.ffprobe)?;
        Ok(())
    }

    /// Run the batch.
    ///
    /// Processes `files` in order, one encoder process at a time, and
    /// sends events on `events`. The stream always ends with exactly
    /// one `Finished` or one `Cancelled`. Send failures (receiver
    /// dropped) are ignored; the run simply finishes without an
    /// audience.
    pub fn run(
        &self,
        files: &[PathBuf],
        plan: &EncodePlan,
        out_dir: &Path,
        events: &Sender<EncodeEvent>,
        cancel: &CancelHandle,
    ) {
        let total = files.len();
        let mut done = 0usize;

        if let Err(e) = std::fs::create_dir_all(out_dir) {
            let _ = events.send(EncodeEvent::RunError {
                message: format!(
                    "failed to create output directory {}: {}",
                    out_dir.display(),
                    e
                ),
            });
            let _ = events.send(EncodeEvent::Finished);
            return;
        }

        tracing::info!("starting batch of {} file(s)", total);

        for input in files {
            if cancel.is_cancelled() {
                tracing::info!("batch cancelled before next file");
                let _ = events.send(EncodeEvent::Cancelled);
                return;
            }

            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| input.display().to_string());
            let output = resolve_output_path(input, plan, out_dir);
            let duration = self.probe.duration(input);

            let _ = events.send(EncodeEvent::FileStarted {
                name: name.clone(),
                total_secs: duration,
            });

            let mut args = plan.args.clone();
            if plan.is_video() {
                let (_, height) = self.probe.resolution(input);
                apply_resolution_cap(
                    &mut args,
                    height,
                    self.settings.encode.resolution_cap_height,
                );
            }

            let mut child = match self.spawn_encoder(input, &args, &output) {
                Ok(child) => child,
                Err(message) => {
                    // Tool missing or unspawnable: fatal to the batch.
                    let _ = events.send(EncodeEvent::RunError { message });
                    break;
                }
            };

            match self.drive_process(&mut child, duration, events, cancel) {
                Ok(ProcessEnd::Cancelled) => {
                    let _ = events.send(EncodeEvent::Cancelled);
                    return;
                }
                Ok(ProcessEnd::Exited(status)) => {
                    let ok = status.success();
                    if ok {
                        done += 1;
                    } else {
                        tracing::warn!(
                            "encode of {} failed with exit code {:?}",
                            name,
                            status.code()
                        );
                    }
                    let _ = events.send(EncodeEvent::FileFinished {
                        ok,
                        name,
                        output,
                    });
                    let _ = events.send(EncodeEvent::OverallProgress { done, total });
                }
                Err(message) => {
                    let _ = events.send(EncodeEvent::RunError { message });
                    break;
                }
            }
        }

        tracing::info!("batch finished: {}/{} succeeded", done, total);
        let _ = events.send(EncodeEvent::Finished);
    }

    /// Launch the encoder for one file with its progress stream piped.
    ///
    /// The command selects overwrite-without-prompt, minimal log noise,
    /// and the machine-readable progress stream on stdout. stderr is
    /// suppressed so no console output reaches the user.
    fn spawn_encoder(
        &self,
        input: &Path,
        plan_args: &[String],
        output: &Path,
    ) -> Result<Child, String> {
        let ffmpeg = &self.settings.tools.ffmpeg;
        let mut cmd = Command::new(ffmpeg);
        cmd.arg("-y")
            .arg("-hide_banner")
            .args(["-loglevel", "warning", "-nostats"])
            .args(["-stats_period", &self.settings.encode.stats_period])
            .args(["-progress", "pipe:1"])
            .arg("-i")
            .arg(input)
            .args(plan_args)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        tracing::debug!("running encoder: {:?}", cmd);

        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                format!("encoder binary '{}' not found", ffmpeg)
            } else {
                format!("failed to start '{}': {}", ffmpeg, e)
            }
        })
    }

    /// Read the progress stream until the process exits or the run is
    /// cancelled, emitting throttled progress events.
    ///
    /// Every line is fed to the parser; emission is coalesced to at
    /// most one event per configured interval carrying the latest
    /// parsed state. A read error is fatal to the batch.
    fn drive_process(
        &self,
        child: &mut Child,
        total_secs: Option<f64>,
        events: &Sender<EncodeEvent>,
        cancel: &CancelHandle,
    ) -> Result<ProcessEnd, String> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| "encoder stdout was not captured".to_string())?;
        let mut reader = BufReader::new(stdout);

        let interval = Duration::from_millis(self.settings.encode.progress_interval_ms);
        let mut parser = ProgressParser::new();
        let mut last_emit = Instant::now();
        let mut buf = Vec::new();

        loop {
            if cancel.is_cancelled() {
                self.shutdown(child);
                return Ok(ProcessEnd::Cancelled);
            }

            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    // Lossy conversion: encoder output may contain
                    // arbitrary bytes and must never fail the job.
                    let line = String::from_utf8_lossy(&buf);
                    parser.consume_line(&line);

                    if last_emit.elapsed() >= interval {
                        last_emit = Instant::now();
                        let snap = parser.snapshot();
                        let _ = events.send(EncodeEvent::FileProgress {
                            processed_secs: snap.processed_secs,
                            total_secs,
                            speed: snap.speed,
                        });
                    }
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!("error reading encoder output: {}", e));
                }
            }
        }

        match child.wait() {
            Ok(status) => Ok(ProcessEnd::Exited(status)),
            Err(e) => Err(format!("failed to wait for encoder: {}", e)),
        }
    }

    /// Two-phase shutdown: request a graceful stop, wait up to the
    /// configured grace, then hard-kill. Always reaps the child before
    /// returning, so no orphaned encoder remains once the run reports
    /// cancelled.
    fn shutdown(&self, child: &mut Child) {
        request_stop(child);

        let deadline = Instant::now() + Duration::from_millis(self.settings.encode.kill_grace_ms);
        loop {
            match child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        break;
                    }
                    thread::sleep(Duration::from_millis(50));
                }
                Err(_) => break,
            }
        }

        let _ = child.kill();
        let _ = child.wait();
    }
}

/// Ask the encoder to stop on its own terms.
#[cfg(unix)]
fn request_stop(child: &mut Child) {
    // SIGTERM lets ffmpeg finalize the output container; SIGKILL comes
    // later if it does not exit within the grace.
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) {
    let _ = child.kill();
}

/// Verify a tool responds to `-version`.
fn check_tool(tool: &'static str, path: &str) -> OrchestratorResult<()> {
    match Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(OrchestratorError::ToolNotFound {
                tool,
                path: path.to_string(),
            })
        }
        Err(e) => Err(OrchestratorError::ToolFailed { tool, source: e }),
    }
}
