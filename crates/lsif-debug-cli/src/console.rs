//! Colored user-facing output and the end-of-run diagnostic replay.

use colored::Colorize;
use lsif_debug_core::{Diagnostic, Diagnostics};

pub fn write_success(message: &str) {
    eprintln!("{} {}", "ok".green().bold(), message);
}

pub fn write_info(message: &str) {
    eprintln!("{} {}", "info:".cyan().bold(), message);
}

pub fn write_warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message);
}

pub fn write_error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

/// Print every collected diagnostic, warnings first, so nothing scrolls away
/// behind per-file progress output.
pub fn replay(diagnostics: &Diagnostics) {
    let warnings: Vec<&Diagnostic> = diagnostics.warnings().collect();
    let errors: Vec<&Diagnostic> = diagnostics.errors().collect();

    if !warnings.is_empty() {
        eprintln!();
        eprintln!("{} ({})", "Warnings".yellow().bold(), warnings.len());
        for d in warnings {
            write_warning(&d.message);
        }
    }

    if !errors.is_empty() {
        eprintln!();
        eprintln!("{} ({})", "Errors".red().bold(), errors.len());
        for d in errors {
            write_error(&d.message);
        }
    }
}
