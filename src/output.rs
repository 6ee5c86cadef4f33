//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Each file leads with its position in the batch and its file name, with the
//! full source path and the result shown as indented context lines. The
//! output reads as an inventory of what happened to every photo while still
//! letting users trace each line back to a file.
//!
//! # Output Format
//!
//! ## Batch
//!
//! ```text
//! 001/003 anna.jpg
//!     Source: photos/anna.jpg
//!     Saved: photos/cropped/anna_cropped.jpg (549x850, face)
//! 002/003 broken.jpg
//!     Source: photos/broken.jpg
//!     Failed: Failed to decode photos/broken.jpg: ...
//! 003/003 ben.png
//!     Source: photos/ben.png
//!     Skipped: output exists
//!
//! Processed 3 files: 1 cropped, 1 failed, 1 skipped
//! ```
//!
//! ## Presets
//!
//! ```text
//! photocard       55 x 85 mm   Photo card
//! passport        35 x 45 mm   Passport photo
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::Preset;
use crate::imaging::CropStrategy;
use crate::process::{BatchStats, FileOutcome, ProcessEvent};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based position as `NNN/TTT`, padded to at least 3 digits.
fn format_position(index: usize, total: usize) -> String {
    let width = total.to_string().len().max(3);
    format!("{index:0>width$}/{total:0>width$}")
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn strategy_label(strategy: &CropStrategy) -> &'static str {
    match strategy {
        CropStrategy::Face(_) => "face",
        CropStrategy::CenterFallback => "center",
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// The context line describing an outcome, without indentation.
pub fn outcome_line(outcome: &FileOutcome) -> String {
    match outcome {
        FileOutcome::Saved {
            output,
            strategy,
            dimensions: (w, h),
            ..
        } => format!(
            "Saved: {} ({w}x{h}, {})",
            output.display(),
            strategy_label(strategy)
        ),
        FileOutcome::SkippedExisting { .. } => "Skipped: output exists".to_string(),
        FileOutcome::SkippedNoFace => "Skipped: no face detected".to_string(),
        FileOutcome::Cancelled => "Skipped: cancelled".to_string(),
        FileOutcome::Failed { error } => format!("Failed: {error}"),
    }
}

// ============================================================================
// Batch progress
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::FileProcessed {
            index,
            total,
            source,
            outcome,
        } => vec![
            format!("{} {}", format_position(*index, *total), file_label(source)),
            format!("    Source: {}", source.display()),
            format!("    {}", outcome_line(outcome)),
        ],
    }
}

/// Format the end-of-batch summary.
pub fn format_summary(stats: &BatchStats) -> Vec<String> {
    if stats.total() == 0 {
        return vec!["No images found".to_string()];
    }
    vec![format!(
        "Processed {}: {} cropped, {} failed, {} skipped",
        plural(stats.total(), "file"),
        stats.success(),
        stats.failed(),
        stats.skipped()
    )]
}

pub fn print_summary(stats: &BatchStats) {
    println!();
    for line in format_summary(stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Format the preset table, one preset per line.
pub fn format_presets(presets: &[Preset]) -> Vec<String> {
    presets
        .iter()
        .map(|p| {
            let size = format!("{} x {} mm", p.width_mm, p.height_mm);
            format!("{:<15} {:<12} {}", p.name, size, p.label)
        })
        .collect()
}

pub fn print_presets(presets: &[Preset]) {
    for line in format_presets(presets) {
        println!("{}", line);
    }
}
