// src/status.rs

//! Status reporter (§4.N)
//!
//! The build and install pipeline reports its progress through this trait
//! rather than writing to the terminal directly, so the CLI can render a
//! progress bar while tests and non-interactive runs stay silent or log
//! plainly.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// A sink for pipeline progress events. Implementations must be safe to
/// call from a single-threaded pipeline driver; nothing here requires
/// `Send`/`Sync` beyond what a trait object needs.
pub trait StatusReporter {
    fn begin_stage(&self, stage: &str);
    fn message(&self, text: &str);
    fn finish_stage(&self, stage: &str);
    fn fail_stage(&self, stage: &str, reason: &str);
}

/// Reports nothing. Used by library callers that only care about the
/// `Result`.
pub struct SilentReporter;

impl StatusReporter for SilentReporter {
    fn begin_stage(&self, _stage: &str) {}
    fn message(&self, _text: &str) {}
    fn finish_stage(&self, _stage: &str) {}
    fn fail_stage(&self, _stage: &str, _reason: &str) {}
}

/// Reports through `tracing`, for non-interactive runs (CI logs, daemons).
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn begin_stage(&self, stage: &str) {
        info!(stage, "starting");
    }

    fn message(&self, text: &str) {
        info!("{text}");
    }

    fn finish_stage(&self, stage: &str) {
        info!(stage, "done");
    }

    fn fail_stage(&self, stage: &str, reason: &str) {
        info!(stage, reason, "failed");
    }
}

/// Renders a spinner on the terminal for interactive CLI use.
pub struct CliReporter {
    bar: Mutex<ProgressBar>,
}

impl CliReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { bar: Mutex::new(bar) }
    }
}

impl Default for CliReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for CliReporter {
    fn begin_stage(&self, stage: &str) {
        let bar = self.bar.lock().unwrap();
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        bar.set_message(format!("{stage}..."));
    }

    fn message(&self, text: &str) {
        self.bar.lock().unwrap().set_message(text.to_string());
    }

    fn finish_stage(&self, stage: &str) {
        self.bar.lock().unwrap().println(format!("✓ {stage}"));
    }

    fn fail_stage(&self, stage: &str, reason: &str) {
        self.bar.lock().unwrap().println(format!("✗ {stage}: {reason}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_reporter_does_not_panic() {
        let reporter = SilentReporter;
        reporter.begin_stage("build");
        reporter.message("compiling");
        reporter.finish_stage("build");
        reporter.fail_stage("check", "oops");
    }

    #[test]
    fn log_reporter_does_not_panic() {
        let reporter = LogReporter;
        reporter.begin_stage("build");
        reporter.finish_stage("build");
    }
}
