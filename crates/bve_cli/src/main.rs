//! Batch video encoder - command line front end.
//!
//! The CLI is the event consumer: it collects the inputs, plan and
//! output directory, runs the orchestrator on a worker thread, and
//! drains the event stream on a fixed cadence to drive terminal
//! progress bars. Ctrl-C maps to the shared cancel flag.

mod consumer;

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use bve_core::config::ConfigManager;
use bve_core::orchestrator::{CancelHandle, EncodeOrchestrator};
use bve_core::plan::{build_plan, is_video_file, EncodeMode};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Quality-preserving re-encode (CRF 18, slow, audio copy).
    Quality,
    /// Size-optimized re-encode (CRF 28, veryslow, AAC 128k, 1080p cap).
    Size,
    /// Extract audio only (.m4a, AAC 128k).
    Audio,
}

impl From<ModeArg> for EncodeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Quality => EncodeMode::Quality,
            ModeArg::Size => EncodeMode::Size,
            ModeArg::Audio => EncodeMode::AudioOnly,
        }
    }
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "bve")]
#[command(version)]
#[command(about = "Batch video compressor / audio extractor")]
struct Args {
    /// Processing mode
    #[arg(value_enum)]
    mode: ModeArg,

    /// Input video files, processed in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory (created if absent)
    #[arg(short, long, default_value = "bve_output")]
    out_dir: PathBuf,

    /// Config file path
    #[arg(long, default_value = "bve.toml")]
    config: PathBuf,

    /// Override the encoder binary from the config
    #[arg(long)]
    ffmpeg: Option<String>,

    /// Override the probe binary from the config
    #[arg(long)]
    ffprobe: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let mut manager = ConfigManager::new(&args.config);
    manager
        .load_or_create()
        .with_context(|| format!("loading config {}", args.config.display()))?;

    let settings = manager.settings_mut();
    if let Some(ffmpeg) = args.ffmpeg {
        settings.tools.ffmpeg = ffmpeg;
    }
    if let Some(ffprobe) = args.ffprobe {
        settings.tools.ffprobe = ffprobe;
    }

    let files: Vec<PathBuf> = args
        .inputs
        .iter()
        .filter(|p| {
            if is_video_file(p) {
                true
            } else {
                warn!("skipping non-video input: {}", p.display());
                false
            }
        })
        .cloned()
        .collect();
    if files.is_empty() {
        bail!("no video files among the inputs");
    }

    let orchestrator = EncodeOrchestrator::new(manager.settings().clone());
    orchestrator
        .validate_tools()
        .context("external tools are required (install ffmpeg, or point --ffmpeg/--ffprobe at the binaries)")?;

    let plan = build_plan(args.mode.into());
    let total = files.len();

    let (tx, rx) = mpsc::channel();
    let cancel = CancelHandle::new();

    let ctrlc_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\ncancelling, waiting for the encoder to stop...");
        ctrlc_cancel.cancel();
    })
    .context("installing Ctrl-C handler")?;

    let out_dir = args.out_dir.clone();
    let worker = thread::spawn(move || {
        orchestrator.run(&files, &plan, &out_dir, &tx, &cancel);
    });

    let summary = consumer::poll_events(rx, total);

    worker.join().expect("worker thread panicked");

    if summary.cancelled {
        eprintln!("cancelled; some files may be incomplete");
        std::process::exit(130);
    }
    if summary.errored || summary.failed > 0 {
        eprintln!(
            "finished with errors: {}/{} succeeded",
            summary.done, summary.total
        );
        std::process::exit(1);
    }

    println!(
        "all done: {}/{} files written to {}",
        summary.done,
        summary.total,
        args.out_dir.display()
    );
    Ok(())
}
