//! Event consumer: terminal rendering of the orchestrator stream.
//!
//! The main thread sits in a poll loop: every tick it drains all
//! pending events, updates the progress bars, and sleeps. Rendering
//! never touches the worker; the channel is the only link.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use bve_core::orchestrator::EncodeEvent;

const POLL_TICK: Duration = Duration::from_millis(500);

/// Outcome of one batch, tallied from the event stream.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub done: usize,
    pub total: usize,
    pub failed: usize,
    pub errored: bool,
    pub cancelled: bool,
}

impl RunSummary {
    fn apply(&mut self, event: &EncodeEvent) {
        match event {
            EncodeEvent::FileFinished { ok: false, .. } => self.failed += 1,
            EncodeEvent::OverallProgress { done, total } => {
                self.done = *done;
                self.total = *total;
            }
            EncodeEvent::RunError { .. } => self.errored = true,
            EncodeEvent::Cancelled => self.cancelled = true,
            _ => {}
        }
    }
}

/// Drain the event stream until it terminates, rendering progress.
///
/// Returns once a terminal event arrives or the sender side hangs up.
pub fn poll_events(rx: Receiver<EncodeEvent>, total: usize) -> RunSummary {
    let multi = MultiProgress::new();
    let overall = multi.add(ProgressBar::new(total as u64));
    overall.set_style(overall_style());
    overall.set_prefix("batch");

    let mut summary = RunSummary {
        total,
        ..RunSummary::default()
    };
    let mut file_bar: Option<ProgressBar> = None;

    'poll: loop {
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    summary.apply(&event);
                    let terminal = event.is_terminal();
                    render(&multi, &overall, &mut file_bar, event);
                    if terminal {
                        break 'poll;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'poll,
            }
        }
        thread::sleep(POLL_TICK);
    }

    if let Some(bar) = file_bar.take() {
        bar.finish_and_clear();
    }
    overall.finish_and_clear();
    summary
}

fn render(
    multi: &MultiProgress,
    overall: &ProgressBar,
    file_bar: &mut Option<ProgressBar>,
    event: EncodeEvent,
) {
    match event {
        EncodeEvent::FileStarted { name, total_secs } => {
            let bar = match total_secs {
                // Bar positions are in whole seconds of media time.
                Some(secs) => {
                    let bar = multi.add(ProgressBar::new(secs.ceil() as u64));
                    bar.set_style(file_style());
                    bar
                }
                None => {
                    let bar = multi.add(ProgressBar::new_spinner());
                    bar.set_style(spinner_style());
                    bar.enable_steady_tick(Duration::from_millis(120));
                    bar
                }
            };
            bar.set_prefix(name);
            *file_bar = Some(bar);
        }
        EncodeEvent::FileProgress {
            processed_secs,
            speed,
            ..
        } => {
            if let Some(bar) = file_bar {
                bar.set_position(processed_secs as u64);
                if let Some(speed) = speed {
                    bar.set_message(speed);
                }
            }
        }
        EncodeEvent::FileFinished { ok, name, output } => {
            if let Some(bar) = file_bar.take() {
                bar.finish_and_clear();
            }
            let line = if ok {
                format!(
                    "{} {} -> {}",
                    style("done").green().bold(),
                    name,
                    output.display()
                )
            } else {
                format!("{} {}", style("failed").red().bold(), name)
            };
            let _ = multi.println(line);
        }
        EncodeEvent::OverallProgress { done, .. } => {
            overall.set_position(done as u64);
        }
        EncodeEvent::RunError { message } => {
            let _ = multi.println(format!("{} {}", style("error").red().bold(), message));
        }
        EncodeEvent::Cancelled | EncodeEvent::Finished => {}
    }
}

fn overall_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:>12} [{bar:30.green}] {pos}/{len} files")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn file_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:>12} [{bar:30.cyan/blue}] {pos}s/{len}s {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:>12} {spinner} {pos}s {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
