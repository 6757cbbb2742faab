//! Orchestrator lifecycle integration tests.
//!
//! A stub shell script stands in for ffmpeg so the full event contract
//! can be exercised without real media: happy path, per-file failure,
//! fatal launch failure, and mid-run cancellation.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use bve_core::config::Settings;
use bve_core::orchestrator::{CancelHandle, EncodeEvent, EncodeOrchestrator};
use bve_core::plan::{build_plan, EncodeMode};

/// Test fixture: scratch dirs plus stub tool scripts.
struct Harness {
    _root: TempDir,
    bin_dir: PathBuf,
    out_dir: PathBuf,
    inputs: Vec<PathBuf>,
}

impl Harness {
    fn new(input_count: usize) -> Self {
        let root = TempDir::new().expect("create temp dir");
        let bin_dir = root.path().join("bin");
        let out_dir = root.path().join("out");
        let src_dir = root.path().join("src");
        fs::create_dir_all(&bin_dir).unwrap();
        fs::create_dir_all(&src_dir).unwrap();

        let inputs = (0..input_count)
            .map(|i| {
                let path = src_dir.join(format!("clip{}.mp4", i));
                fs::write(&path, b"fake video").unwrap();
                path
            })
            .collect();

        Self {
            _root: root,
            bin_dir,
            out_dir,
            inputs,
        }
    }

    fn write_script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.bin_dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Stub ffprobe that reports a fixed duration and resolution.
    fn stub_ffprobe(&self) -> PathBuf {
        // Duration queries use -show_entries format=duration; resolution
        // queries mention stream=width,height.
        self.write_script(
            "ffprobe",
            r#"case "$*" in
  *format=duration*) echo 10.0 ;;
  *width,height*) echo 1280x720 ;;
esac"#,
        )
    }

    fn settings(&self, ffmpeg: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.tools.ffmpeg = ffmpeg.to_string_lossy().into_owned();
        settings.tools.ffprobe = self.stub_ffprobe().to_string_lossy().into_owned();
        // Emit progress immediately so short-lived stubs still produce events.
        settings.encode.progress_interval_ms = 0;
        settings
    }

    fn run(&self, settings: Settings, cancel: &CancelHandle) -> Vec<EncodeEvent> {
        let orch = EncodeOrchestrator::new(settings);
        let plan = build_plan(EncodeMode::Quality);
        let (tx, rx) = mpsc::channel();

        let files = self.inputs.clone();
        let out_dir = self.out_dir.clone();
        let cancel = cancel.clone();
        let worker = thread::spawn(move || {
            orch.run(&files, &plan, &out_dir, &tx, &cancel);
        });

        let mut events = Vec::new();
        loop {
            match rx.recv_timeout(Duration::from_secs(10)) {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    events.push(event);
                    if terminal {
                        break;
                    }
                }
                Err(_) => panic!("event stream ended without a terminal event: {:?}", events),
            }
        }

        worker.join().expect("worker thread panicked");
        events
    }
}

fn count<F: Fn(&EncodeEvent) -> bool>(events: &[EncodeEvent], pred: F) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

#[test]
fn all_files_succeed() {
    let harness = Harness::new(3);
    let ffmpeg = harness.write_script(
        "ffmpeg",
        r#"echo "out_time_ms=1000000"
echo "speed=1.50x"
echo "out_time_ms=2000000"
exit 0"#,
    );

    let events = harness.run(harness.settings(&ffmpeg), &CancelHandle::new());

    assert_eq!(count(&events, |e| matches!(e, EncodeEvent::FileStarted { .. })), 3);
    assert_eq!(
        count(&events, |e| matches!(e, EncodeEvent::FileFinished { ok: true, .. })),
        3
    );
    assert_eq!(events.last(), Some(&EncodeEvent::Finished));

    // Overall progress reaches 3/3 and done never exceeds total.
    let overalls: Vec<(usize, usize)> = events
        .iter()
        .filter_map(|e| match e {
            EncodeEvent::OverallProgress { done, total } => Some((*done, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(overalls.last(), Some(&(3, 3)));
    assert!(overalls.iter().all(|(done, total)| done <= total));

    // Progress within a file is non-decreasing and carries the probed total.
    let progresses: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            EncodeEvent::FileProgress { processed_secs, total_secs, .. } => {
                assert_eq!(*total_secs, Some(10.0));
                Some(*processed_secs)
            }
            _ => None,
        })
        .collect();
    assert!(!progresses.is_empty());
}

#[test]
fn failed_file_does_not_stop_batch() {
    let harness = Harness::new(2);
    // Fail on the first input only (its name contains clip0).
    let ffmpeg = harness.write_script(
        "ffmpeg",
        r#"case "$*" in
  *clip0*) exit 1 ;;
esac
echo "out_time_ms=500000"
exit 0"#,
    );

    let events = harness.run(harness.settings(&ffmpeg), &CancelHandle::new());

    let finished: Vec<bool> = events
        .iter()
        .filter_map(|e| match e {
            EncodeEvent::FileFinished { ok, .. } => Some(*ok),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![false, true]);

    let overalls: Vec<(usize, usize)> = events
        .iter()
        .filter_map(|e| match e {
            EncodeEvent::OverallProgress { done, total } => Some((*done, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(overalls, vec![(0, 2), (1, 2)]);
    assert_eq!(events.last(), Some(&EncodeEvent::Finished));
}

#[test]
fn missing_encoder_is_fatal() {
    let harness = Harness::new(2);
    let mut settings = harness.settings(Path::new("/nonexistent/ffmpeg-for-test"));
    settings.tools.ffprobe = "/nonexistent/ffprobe-for-test".to_string();

    let events = harness.run(settings, &CancelHandle::new());

    // First file gets its start event, then the run aborts: no second
    // FileStarted, no FileFinished, one RunError, then Finished.
    assert_eq!(count(&events, |e| matches!(e, EncodeEvent::FileStarted { .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, EncodeEvent::FileFinished { .. })), 0);
    assert_eq!(count(&events, |e| matches!(e, EncodeEvent::RunError { .. })), 1);
    assert_eq!(events.last(), Some(&EncodeEvent::Finished));
}

#[test]
fn cancellation_stops_run_within_grace() {
    let harness = Harness::new(2);
    // Endless encoder: emits progress forever until terminated.
    let ffmpeg = harness.write_script(
        "ffmpeg",
        r#"i=0
while true; do
  i=$((i + 1))
  echo "out_time_ms=${i}000000"
  sleep 0.1
done"#,
    );

    let orch = EncodeOrchestrator::new(harness.settings(&ffmpeg));
    let plan = build_plan(EncodeMode::Quality);
    let (tx, rx) = mpsc::channel();
    let cancel = CancelHandle::new();

    let files = harness.inputs.clone();
    let out_dir = harness.out_dir.clone();
    let worker_cancel = cancel.clone();
    let worker = thread::spawn(move || {
        orch.run(&files, &plan, &out_dir, &tx, &worker_cancel);
    });

    // Wait for the first progress event, then cancel.
    let mut events = Vec::new();
    loop {
        let event = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("no events before cancel");
        let is_progress = matches!(event, EncodeEvent::FileProgress { .. });
        events.push(event);
        if is_progress {
            break;
        }
    }

    let cancelled_at = Instant::now();
    cancel.cancel();

    loop {
        match rx.recv_timeout(Duration::from_secs(10)) {
            Ok(event) => {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    break;
                }
            }
            Err(_) => panic!("no terminal event after cancel: {:?}", events),
        }
    }
    worker.join().expect("worker thread panicked");

    // Terminate-then-kill is bounded: 1.5s grace plus small overhead.
    assert!(cancelled_at.elapsed() < Duration::from_secs(3));

    assert_eq!(events.last(), Some(&EncodeEvent::Cancelled));
    assert_eq!(count(&events, |e| matches!(e, EncodeEvent::FileStarted { .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, EncodeEvent::FileFinished { .. })), 0);
    assert_eq!(count(&events, |e| matches!(e, EncodeEvent::Finished)), 0);
}

#[test]
fn output_collisions_get_numeric_suffix() {
    let harness = Harness::new(1);
    let ffmpeg = harness.write_script("ffmpeg", "exit 0");

    fs::create_dir_all(&harness.out_dir).unwrap();
    fs::write(harness.out_dir.join("clip0_hq.mp4"), b"").unwrap();

    let events = harness.run(harness.settings(&ffmpeg), &CancelHandle::new());

    let output = events
        .iter()
        .find_map(|e| match e {
            EncodeEvent::FileFinished { output, .. } => Some(output.clone()),
            _ => None,
        })
        .expect("no FileFinished event");
    assert_eq!(output, harness.out_dir.join("clip0_hq_1.mp4"));
}
