//! User-facing output utilities for clean, colored terminal messages
//!
//! Messages go to stderr without log decoration (timestamps, levels, crate
//! names). Record formatting for `ls` and `info` lives here too so the CLI
//! handlers only decide what to print.

use owo_colors::OwoColorize;

use crate::models::{FieldValue, Record};
use crate::query::fields;

/// Display a warning message to the user in yellow with padding
///
/// # Example
/// ```ignore
/// output::warn("No items matched 'artist:nobody'");
/// ```
pub fn warn(message: &str) {
    eprintln!("\n{}\n", message.yellow());
}

/// Display an error message to the user in red with padding
///
/// # Example
/// ```ignore
/// output::error("Error: Unknown track field: 'bogus'");
/// ```
pub fn error(message: &str) {
    eprintln!("\n{}\n", message.red());
}

/// Display an informational message to the user in default color with padding
pub fn info(message: &str) {
    eprintln!("\n{}\n", message);
}

/// One-line summary of a record for `ls`
pub fn format_line(record: &Record, paths: bool) -> String {
    if paths {
        record.path().display().to_string()
    } else {
        record.to_string()
    }
}

/// `field: value` lines for every present field of a record, sorted by name
pub fn format_info(record: &Record) -> String {
    let mut lines: Vec<(&str, String)> = fields(record.kind())
        .iter()
        .filter_map(|field| match field.value(record) {
            FieldValue::Missing => None,
            value => Some((field.name, value.to_string())),
        })
        .collect();
    lines.sort_by(|a, b| a.0.cmp(b.0));

    let width = lines.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    lines
        .iter()
        .map(|(name, value)| format!("{:>width$}: {}", name, value, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}
