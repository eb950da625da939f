//! Settings subcommand implementation.
//!
//! Handles the `portchecker settings` command for viewing and persisting
//! preferences.

use crate::config::AppSettings;
use crate::error::CliResult;
use crate::output;
use clap::{Parser, Subcommand};
use std::path::Path;

/// View and change saved settings.
#[derive(Parser, Debug)]
pub struct SettingsCommand {
    #[command(subcommand)]
    pub action: SettingsAction,
}

/// Settings actions.
#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Show the current settings
    Show,

    /// Change one setting
    ///
    /// Keys: workers, timeout, sort, show-closed, show-unknown, reverse-dns,
    /// cidr-policy, max-cidr-hosts
    Set {
        /// Setting name
        key: String,

        /// New value
        value: String,
    },

    /// Restore the default settings
    Reset,
}

impl SettingsCommand {
    /// Execute the settings command.
    pub fn execute(&self, path: Option<&Path>, quiet: bool) -> CliResult<()> {
        match &self.action {
            SettingsAction::Show => {
                let settings = AppSettings::load(path)?;
                output::print_settings(&settings);
            }
            SettingsAction::Set { key, value } => {
                let mut settings = AppSettings::load(path)?;
                settings.set(key, value)?;
                let file = settings.save(path)?;
                if !quiet {
                    output::print_success(&format!(
                        "Set '{}' to '{}' in {}",
                        key,
                        value,
                        file.display()
                    ));
                }
            }
            SettingsAction::Reset => {
                let file = AppSettings::default().save(path)?;
                if !quiet {
                    output::print_success(&format!("Restored defaults in {}", file.display()));
                }
            }
        }
        Ok(())
    }
}
