//! CLI output formatting with colors.
//!
//! Status messages go to stderr; command results (tables, JSON) go to stdout.
//! Colors auto-disable when the stream is not a TTY or `NO_COLOR` is set.

use crate::diagnostic::{Diagnostic, DiagnosticLevel};
use owo_colors::OwoColorize;
use std::fmt::Display;
use std::path::Path;

/// Check if stderr supports colors (TTY detection)
fn use_colors() -> bool {
    supports_color::on(supports_color::Stream::Stderr).is_some()
}

/// Check if stdout supports colors, for table output
pub fn stdout_supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

// =============================================================================
// Color Helpers
// =============================================================================

/// Format a success message (green checkmark prefix)
pub fn success(msg: impl Display) {
    if use_colors() {
        eprintln!("{} {}", "✓".green(), msg);
    } else {
        eprintln!("✓ {}", msg);
    }
}

/// Format a warning that did not stop the command
pub fn warn(msg: impl Display) {
    if use_colors() {
        eprintln!("{} {}", "!".yellow().bold(), msg);
    } else {
        eprintln!("! {}", msg);
    }
}

/// Format an info/action message (no special prefix)
pub fn info(msg: impl Display) {
    eprintln!("{}", msg);
}

/// Format a created path message
pub fn created_path(path: &Path) {
    if use_colors() {
        eprintln!("{}: {}", "Created".green(), path.display().cyan());
    } else {
        eprintln!("Created: {}", path.display());
    }
}

/// Format a created entity message
pub fn created(kind: &str, id: impl Display, name: &str) {
    if use_colors() {
        eprintln!(
            "{} {} {} ({})",
            "Created".green(),
            kind,
            id.to_string().cyan().bold(),
            name
        );
    } else {
        eprintln!("Created {} {} ({})", kind, id, name);
    }
}

/// Format an updated entity message
pub fn updated(kind: &str, id: impl Display) {
    if use_colors() {
        eprintln!("Updated {}: {}", kind, id.to_string().cyan().bold());
    } else {
        eprintln!("Updated {}: {}", kind, id);
    }
}

/// Format a removed entity message
pub fn removed(kind: &str, id: impl Display) {
    if use_colors() {
        eprintln!("Removed {}: {}", kind, id.to_string().yellow().bold());
    } else {
        eprintln!("Removed {}: {}", kind, id);
    }
}

/// Format a field set message
pub fn field_set(id: impl Display, field: &str, value: &str) {
    if use_colors() {
        eprintln!(
            "Set {}.{} = {}",
            id.to_string().cyan().bold(),
            field.yellow(),
            value.white()
        );
    } else {
        eprintln!("Set {}.{} = {}", id, field, value);
    }
}

/// Format a lifecycle transition message
pub fn transitioned(id: impl Display, action: &str, target: &str) {
    if use_colors() {
        eprintln!(
            "{} {}: {}",
            action,
            id.to_string().cyan().bold(),
            target.green()
        );
    } else {
        eprintln!("{} {}: {}", action, id, target);
    }
}

/// Format a "nothing to show" message
pub fn not_found(kind: &str, location: impl Display) {
    if use_colors() {
        eprintln!("No {}s found for {}", kind, location.to_string().cyan());
    } else {
        eprintln!("No {}s found for {}", kind, location);
    }
}

/// Format check summary header
pub fn check_header() {
    if use_colors() {
        eprintln!("{}:", "Checked".bold());
    } else {
        eprintln!("Checked:");
    }
}

/// Format check count line
pub fn check_count(count: usize, kind: &str) {
    if use_colors() {
        eprintln!("  {} {}", count.to_string().cyan().bold(), kind);
    } else {
        eprintln!("  {} {}", count, kind);
    }
}

// =============================================================================
// Dry-run previews
// =============================================================================

/// Describe a file that would be written
pub fn dry_run_file_preview(path: &Path, content: &str) {
    if use_colors() {
        eprintln!("{} {}", "Would write:".yellow(), path.display().cyan());
    } else {
        eprintln!("Would write: {}", path.display());
    }
    for line in content.lines() {
        eprintln!("  | {line}");
    }
}

/// Describe a directory that would be created
pub fn dry_run_mkdir(path: &Path) {
    if use_colors() {
        eprintln!("{} {}", "Would create:".yellow(), path.display().cyan());
    } else {
        eprintln!("Would create: {}", path.display());
    }
}

// =============================================================================
// Diagnostic Formatting
// =============================================================================

/// Format a diagnostic message
pub fn diagnostic(diag: &Diagnostic) {
    if use_colors() {
        let level_str = match diag.level {
            DiagnosticLevel::Error => "error".red().bold().to_string(),
            DiagnosticLevel::Warning => "warning".yellow().bold().to_string(),
        };
        eprintln!(
            "{}[{}]: {} ({})",
            level_str,
            diag.code.code().bright_black(),
            diag.message,
            diag.file.cyan()
        );
    } else {
        eprintln!("{diag}");
    }
}
