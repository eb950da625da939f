//! Progress bar driven by scan progress notifications.

use crate::scanner::{JobState, ProgressObserver, ScanResult};
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

/// Renders job progress on stderr with `indicatif`.
#[derive(Debug, Clone)]
pub struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    /// Create a bar; its length is set when the job starts.
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .map(|s| s.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        let bar = ProgressBar::new(0);
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn on_start(&self, total_units: u64) {
        self.bar.set_length(total_units);
        self.bar.set_position(0);
    }

    fn on_unit(&self, result: &ScanResult, _completed: u64) {
        self.bar.inc(1);
        if result.is_open() {
            self.bar
                .set_message(format!("open: {}:{}", result.address, result.port));
        }
    }

    fn on_finish(&self, state: JobState) {
        match state {
            JobState::Cancelled => self.bar.abandon_with_message("cancelled"),
            JobState::Failed => self.bar.abandon_with_message("failed"),
            _ => self.bar.finish_and_clear(),
        }
    }
}
