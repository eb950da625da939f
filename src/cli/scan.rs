//! Scan subcommand implementation.
//!
//! Handles the `portchecker scan <address>...` command.

use crate::cli::OutputFormat;
use crate::config::AppSettings;
use crate::error::CliResult;
use crate::output::{self, ProgressBarObserver, Visibility};
use crate::scanner::{NoProgress, ProgressObserver, ScanEngine, ScanRequest};
use crate::types::CidrPolicy;
use clap::Parser;
use std::sync::Arc;
use tracing::debug;

/// Scan addresses for open ports.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Addresses to scan (IP, hostname, or CIDR notation)
    ///
    /// Examples:
    ///   192.168.1.1        Single IP address
    ///   example.com        Hostname
    ///   192.168.1.0/24     CIDR range
    #[arg(value_name = "ADDRESS", required = true, num_args = 1..)]
    pub addresses: Vec<String>,

    /// First port of the range
    #[arg(short = 's', long = "start", default_value = "1")]
    pub start_port: u32,

    /// Last port of the range (inclusive)
    #[arg(short = 'e', long = "end", default_value = "65535")]
    pub end_port: u32,

    /// Connection timeout in milliseconds [default: from settings]
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Number of workers [default: from settings]
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Sort results by address, then port
    #[arg(long, overrides_with = "no_sort")]
    pub sort: bool,

    /// Keep results in completion order
    #[arg(long, overrides_with = "sort")]
    pub no_sort: bool,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Show closed ports in output
    #[arg(long, overrides_with = "hide_closed")]
    pub show_closed: bool,

    /// Hide closed ports in output
    #[arg(long, overrides_with = "show_closed")]
    pub hide_closed: bool,

    /// Show ports with an unknown status in output
    #[arg(long, overrides_with = "hide_unknown")]
    pub show_unknown: bool,

    /// Hide ports with an unknown status in output
    #[arg(long, overrides_with = "show_unknown")]
    pub hide_unknown: bool,

    /// Skip reverse DNS lookups of scanned addresses
    #[arg(long)]
    pub no_dns: bool,

    /// Which addresses of a CIDR block to scan
    #[arg(long, value_enum)]
    pub cidr_policy: Option<CidrPolicy>,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, settings: &AppSettings, quiet: bool) -> CliResult<()> {
        let request = ScanRequest::new(
            self.addresses.iter().cloned(),
            self.start_port,
            self.end_port,
            self.timeout.unwrap_or(settings.timeout_ms),
            self.workers.unwrap_or(settings.workers),
            flag(self.sort, self.no_sort, settings.sort),
        )?;
        let visibility = Visibility {
            show_closed: flag(self.show_closed, self.hide_closed, settings.show_closed),
            show_unknown: flag(self.show_unknown, self.hide_unknown, settings.show_unknown),
        };

        let mut config = settings.engine_config();
        if self.no_dns {
            config = config.with_reverse_dns(false);
        }
        if let Some(policy) = self.cidr_policy {
            config = config.with_cidr_policy(policy);
        }
        debug!(?config, "engine configuration");

        let interactive = !quiet && self.output == OutputFormat::Plain;
        if interactive {
            output::print_scan_header(&request);
        }

        let engine = Arc::new(ScanEngine::new(config));
        let interrupt = spawn_interrupt_handler(Arc::clone(&engine));

        let observer: Arc<dyn ProgressObserver> = if interactive {
            Arc::new(ProgressBarObserver::new())
        } else {
            Arc::new(NoProgress)
        };
        let outcome = engine.run(&request, observer).await;
        interrupt.abort();

        let report = outcome?;
        if report.is_cancelled() && !quiet {
            output::print_warning("Scan cancelled; showing partial results.");
        }

        output::print_results(&report, self.output, visibility)?;
        Ok(())
    }
}

/// Resolve a `--x`/`--no-x` flag pair against the saved default.
fn flag(on: bool, off: bool, default: bool) -> bool {
    if on {
        true
    } else if off {
        false
    } else {
        default
    }
}

/// Response to a Ctrl-C, given how many came before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    /// Stop the scan and keep the partial results.
    Cancel,
    /// Leave immediately, e.g. while stuck in a slow DNS phase.
    Exit,
}

fn interrupt_action(previous: usize) -> InterruptAction {
    if previous == 0 {
        InterruptAction::Cancel
    } else {
        InterruptAction::Exit
    }
}

/// Cancel the running scan on the first Ctrl-C; exit on the next one.
fn spawn_interrupt_handler(engine: Arc<ScanEngine>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut previous = 0;
        while tokio::signal::ctrl_c().await.is_ok() {
            match interrupt_action(previous) {
                InterruptAction::Cancel => {
                    output::print_warning("Cancelling scan; press Ctrl-C again to quit.");
                    if let Err(e) = engine.cancel() {
                        debug!(error = %e, "interrupt received with no active scan");
                    }
                }
                InterruptAction::Exit => std::process::exit(130),
            }
            previous += 1;
        }
    })
}
