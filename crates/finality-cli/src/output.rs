//! Output formatting utilities

use crate::error::CliResult;
use colored::*;
use finality_types::{Severity, Violation};
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// A violation line colored by severity
pub fn colorize_violation(violation: &Violation) -> ColoredString {
    let text = violation.to_string();
    match violation.severity() {
        Severity::Critical => text.red().bold(),
        Severity::Blocking => text.red(),
        Severity::Correctable => text.yellow(),
    }
}
