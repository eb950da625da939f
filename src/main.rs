//! portchecker - command-line entry point.

use anyhow::Context;
use clap::Parser;
use portchecker::cli::{print_threads, Cli, Commands};
use portchecker::config::AppSettings;
use portchecker::output;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Scan(cmd) => {
            let settings = AppSettings::load(cli.config.as_deref())
                .context("failed to load settings")?;
            cmd.execute(&settings, cli.quiet).await?;
        }
        Commands::Threads => print_threads(cli.quiet),
        Commands::Settings(cmd) => cmd.execute(cli.config.as_deref(), cli.quiet)?,
    }
    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` or the verbosity flags.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("portchecker={}", cli.log_level())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
