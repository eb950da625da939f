//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::config::AppSettings;
use crate::scanner::{JobState, PortStatus, ScanReport, ScanRequest, ScanResult};
use chrono::SecondsFormat;
use console::{style, Style};
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────────────────";

/// Print a report in human-readable plain text format.
pub fn print_plain(report: &ScanReport, visible: &[&ScanResult]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Header
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "                        {} Scan Results",
        style("portchecker").cyan().bold()
    )?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    let state = match report.state {
        JobState::Cancelled => style(report.state.to_string()).yellow(),
        _ => style(report.state.to_string()).green(),
    };
    writeln!(
        out,
        "  {} {}",
        style("Job ID:").bold(),
        style(report.job_id.short()).dim()
    )?;
    writeln!(out, "  {} {}", style("State:").bold(), state)?;
    writeln!(
        out,
        "  {} {}",
        style("Started:").bold(),
        report.started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )?;
    writeln!(out)?;

    // Statistics
    writeln!(
        out,
        "  {} {} of {} ports probed on {} host(s) by {} worker(s) in {:.2}s",
        style("Statistics:").bold(),
        report.results.len(),
        report.total_units,
        report.hosts,
        report.workers,
        report.duration_ms as f64 / 1000.0
    )?;
    writeln!(
        out,
        "              {} open, {} closed, {} unknown",
        style(report.counts.open).green().bold(),
        style(report.counts.closed).red(),
        style(report.counts.unknown).yellow()
    )?;
    writeln!(out)?;

    if visible.is_empty() {
        writeln!(out, "  {}", style("No ports to display.").dim())?;
    } else {
        let address_width = visible
            .iter()
            .map(|r| r.address.to_string().len())
            .max()
            .unwrap_or(0)
            .max("ADDRESS".len());
        let host_width = visible
            .iter()
            .map(|r| r.host_name.len())
            .max()
            .unwrap_or(0)
            .clamp("HOSTNAME".len(), 32);

        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        writeln!(
            out,
            "  {:<aw$}  {:>5}  {:<hw$}  {:<7}  {}",
            style("ADDRESS").bold(),
            style("PORT").bold(),
            style("HOSTNAME").bold(),
            style("STATUS").bold(),
            style("DATE").bold(),
            aw = address_width,
            hw = host_width,
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;

        for result in visible {
            let status_style = match result.port_status {
                PortStatus::Open => Style::new().green().bold(),
                PortStatus::Closed => Style::new().red(),
                PortStatus::Unknown => Style::new().yellow(),
            };

            writeln!(
                out,
                "  {:<aw$}  {:>5}  {:<hw$}  {:<7}  {}",
                result.address.to_string(),
                result.port,
                truncate_string(&result.host_name, host_width),
                status_style.apply_to(result.port_status.to_string()),
                style(result.scan_date.to_rfc3339_opts(SecondsFormat::Secs, true)).dim(),
                aw = address_width,
                hw = host_width,
            )?;
        }

        writeln!(out, "  {}", style(THIN_RULE).dim())?;
    }

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    Ok(())
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(request: &ScanRequest) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("portchecker").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Addresses: {}",
        style("•").dim(),
        style(request.addresses().join(", ")).white().bold()
    );
    println!(
        "{} Ports: {} ({} per host)",
        style("•").dim(),
        style(request.ports()).white().bold(),
        request.ports().len()
    );
    println!(
        "{} Workers: {}, timeout {} ms",
        style("•").dim(),
        style(request.workers()).yellow(),
        request.timeout().as_millis()
    );
    println!();
}

/// Print the saved settings.
pub fn print_settings(settings: &AppSettings) {
    let yes_no = |b: bool| if b { "yes" } else { "no" };

    println!("\n{}", style("Settings").bold());
    println!("{}", "=".repeat(40));
    println!("Workers:         {}", settings.workers);
    println!("Timeout:         {} ms", settings.timeout_ms);
    println!("Sort results:    {}", yes_no(settings.sort));
    println!("Show closed:     {}", yes_no(settings.show_closed));
    println!("Show unknown:    {}", yes_no(settings.show_unknown));
    println!("Reverse DNS:     {}", yes_no(settings.reverse_dns));
    println!("CIDR policy:     {}", settings.cidr_policy);
    println!("Max CIDR hosts:  {}", settings.max_cidr_hosts);
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Truncate a string to at most `max_len` characters, adding an ellipsis if
/// truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
