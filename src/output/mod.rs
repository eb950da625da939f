//! Output formatting module.
//!
//! Provides formatters for plain text and JSON output of scan results, and
//! the progress bar shown while a scan runs.

mod json_format;
mod plain;
mod progress;

pub use json_format::print_json;
pub use plain::{
    print_error, print_plain, print_scan_header, print_settings, print_success,
    print_warning,
};
pub use progress::ProgressBarObserver;

use crate::cli::OutputFormat;
use crate::scanner::{PortStatus, ScanReport, ScanResult};
use std::io;

/// Which statuses are shown. Applied to presentation only; the report
/// always carries every probed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub show_closed: bool,
    pub show_unknown: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            show_closed: true,
            show_unknown: true,
        }
    }
}

impl Visibility {
    /// Whether results with `status` are shown.
    pub fn allows(&self, status: PortStatus) -> bool {
        match status {
            PortStatus::Open => true,
            PortStatus::Closed => self.show_closed,
            PortStatus::Unknown => self.show_unknown,
        }
    }

    /// The visible subset of `results`, in order.
    pub fn filter<'a>(&self, results: &'a [ScanResult]) -> Vec<&'a ScanResult> {
        results
            .iter()
            .filter(|r| self.allows(r.port_status))
            .collect()
    }
}

/// Format and print a scan report according to the specified format.
pub fn print_results(
    report: &ScanReport,
    format: OutputFormat,
    visibility: Visibility,
) -> io::Result<()> {
    let visible = visibility.filter(&report.results);
    match format {
        OutputFormat::Plain => print_plain(report, &visible),
        OutputFormat::Json => print_json(&visible),
    }
}
