//! Configuration management for portchecker.
//!
//! Provides XDG-compliant storage of the CLI shell's preferences.

mod settings;

pub use settings::{AppSettings, Paths};
