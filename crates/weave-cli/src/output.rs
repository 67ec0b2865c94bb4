// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! CLI output formatting with colors and styling.
//!
//! Respects NO_COLOR and FORCE_COLOR environment variables.
//! Colors are automatically disabled when output is piped.

use std::time::Duration;

use colored::{ColoredString, Colorize};

/// Initialize color support based on environment.
/// Call once at startup.
pub fn init() {
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    } else if std::env::var("FORCE_COLOR").is_ok() {
        colored::control::set_override(true);
    }
}

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn banner_ok(phase: &str) -> String {
    format!(
        "{} {} {}",
        "===".dimmed(),
        format!("{} OK", phase).green().bold(),
        "===".dimmed()
    )
}

pub fn status_pass() -> ColoredString {
    "✓".green()
}

pub fn status_fail() -> ColoredString {
    "✗".red()
}

pub fn task_id(id: u64) -> ColoredString {
    format!("#{:<3}", id).blue().bold()
}

pub fn file_path(path: &str) -> ColoredString {
    path.underline()
}

pub fn duration(d: Duration) -> ColoredString {
    format!("{:>10.3?}", d).cyan()
}

pub fn dim(text: &str) -> ColoredString {
    text.dimmed()
}
