//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Encoding progress
//!
//! One line per finished file, numbered by completion (not document order,
//! since files finish in whatever order the workers get to them):
//!
//! ```text
//! Encoding 3 media files
//!     001/003 clip.mp4 (1.2 MB)
//!     002/003 beach.jpg (340.5 KB)
//!     003/003 gone.png
//!         Failed: No such file or directory (os error 2)
//! ```
//!
//! ## Generate
//!
//! ```text
//! trip.alb → trip.html
//!     4 media rows, 3 prose blocks
//!     Stylesheet: default.css
//!     Degraded: gone.png
//! Embedded 3 media files, 1 degraded
//! ```
//!
//! ## Make template
//!
//! ```text
//! Generated trip.alb (12 images, 2 videos)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::generate::{GenerateReport, StylesheetStatus};
use crate::process::EncodeEvent;
use crate::template::TemplateReport;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 photo`, `2 photos`.
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Human-readable byte size, one decimal above a kilobyte.
fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Encoding progress
// ============================================================================

/// Format a single encoding progress event as display lines.
pub fn format_encode_event(event: &EncodeEvent) -> Vec<String> {
    match event {
        EncodeEvent::Started { total } => {
            vec![format!("Encoding {}", plural(*total, "media file"))]
        }
        EncodeEvent::Encoded {
            completed,
            total,
            basename,
            bytes,
        } => vec![format!(
            "{}{}/{} {} ({})",
            indent(1),
            format_index(*completed),
            format_index(*total),
            basename,
            format_size(*bytes)
        )],
        EncodeEvent::Failed {
            completed,
            total,
            basename,
            reason,
        } => vec![
            format!(
                "{}{}/{} {}",
                indent(1),
                format_index(*completed),
                format_index(*total),
                basename
            ),
            format!("{}Failed: {}", indent(2), reason),
        ],
    }
}

/// Print an encoding progress event to stdout.
pub fn print_encode_event(event: &EncodeEvent) {
    for line in format_encode_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate
// ============================================================================

/// Format the summary of a finished `generate` run.
pub fn format_generate_output(report: &GenerateReport) -> Vec<String> {
    let mut lines = vec![
        format!("{} → {}", file_name(&report.album), file_name(&report.output)),
        format!(
            "{}{}, {}",
            indent(1),
            plural(report.media_rows, "media row"),
            plural(report.prose_blocks, "prose block")
        ),
    ];

    match &report.stylesheet {
        StylesheetStatus::None => {}
        StylesheetStatus::Embedded(path) => {
            lines.push(format!("{}Stylesheet: {}", indent(1), path.display()));
        }
        StylesheetStatus::Unreadable(path) => {
            lines.push(format!(
                "{}Stylesheet: {} (unreadable, skipped)",
                indent(1),
                path.display()
            ));
        }
    }

    for failure in &report.failures {
        lines.push(format!("{}Degraded: {}", indent(1), failure.basename));
    }

    if report.failures.is_empty() {
        lines.push(format!("Embedded {}", plural(report.embedded, "media file")));
    } else {
        lines.push(format!(
            "Embedded {}, {} degraded",
            plural(report.embedded, "media file"),
            report.failures.len()
        ));
    }
    lines
}

/// Print the generate summary to stdout.
pub fn print_generate_output(report: &GenerateReport) {
    for line in format_generate_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Make template
// ============================================================================

pub fn format_template_output(report: &TemplateReport) -> Vec<String> {
    vec![format!(
        "Generated {} ({}, {})",
        report.output.display(),
        plural(report.images, "image"),
        plural(report.videos, "video")
    )]
}

pub fn print_template_output(report: &TemplateReport) {
    for line in format_template_output(report) {
        println!("{}", line);
    }
}
