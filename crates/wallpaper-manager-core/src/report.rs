//! Progress and summary reporting.

use std::fmt::Write as _;

use crate::config::Config;
use crate::types::{display_name, BatchReport, Category, Inventory, JobResult};

/// Number of failures listed in a batch summary
const ERROR_SAMPLE: usize = 5;

/// Number of themes listed before eliding the rest
const THEME_SAMPLE: usize = 10;

/// What a batch is doing, for progress headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchKind {
    Upscale,
    Theme(String),
}

/// Receives progress notifications and free-text messages
pub trait Reporter {
    fn message(&self, text: &str);

    fn batch_started(&self, _kind: &BatchKind, _total: usize) {}

    fn group_started(&self, _scale: u32, _count: usize) {}

    fn job_started(&self, _index: usize, _total: usize, _name: &str) {}

    fn job_finished(&self, _result: &JobResult) {}

    fn batch_finished(&self, _report: &BatchReport) {}
}

/// Reporter that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn message(&self, _text: &str) {}
}

pub fn scan_summary(inventory: &Inventory, config: &Config) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "SCAN SUMMARY");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "Good quality (>={}): {}",
        config.target(),
        inventory.count(Category::Good)
    );
    let _ = writeln!(
        out,
        "Can be upscaled (needs up to {}x): {}",
        config.max_upscale_factor,
        inventory.count(Category::Upscalable)
    );
    let _ = writeln!(
        out,
        "Too low quality (needs >{}x): {}",
        config.max_upscale_factor,
        inventory.count(Category::TooLow)
    );
    let _ = writeln!(out, "Total images found: {}", inventory.len());
    if !inventory.errors.is_empty() {
        let _ = writeln!(out, "Unreadable files skipped: {}", inventory.errors.len());
    }
    let _ = write!(out, "{}", rule);
    out
}

/// Totals of a batch plus a sample of its errors
///
/// `verb` is the past tense shown in the header, e.g. "upscaled".
pub fn batch_summary(verb: &str, report: &BatchReport, with_errors: bool) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Successfully {}: {}", verb, report.successes.len());
    let _ = writeln!(out, "Failed: {}", report.failures.len());
    let _ = write!(out, "{}", rule);

    if with_errors && !report.failures.is_empty() {
        let _ = write!(out, "\nSample of errors (first {}):", ERROR_SAMPLE);
        for failed in report.failures.iter().take(ERROR_SAMPLE) {
            let _ = write!(out, "\n  - {}: {}", display_name(&failed.source), failed.message);
        }
        if report.failures.len() > ERROR_SAMPLE {
            let _ = write!(
                out,
                "\n  ... and {} more errors",
                report.failures.len() - ERROR_SAMPLE
            );
        }
    }

    out
}

/// Short listing of the available themes, `None` when there are none
pub fn theme_listing(themes: &[String], tool: &str) -> Option<String> {
    if themes.is_empty() {
        return None;
    }

    let shown: Vec<&str> = themes.iter().take(THEME_SAMPLE).map(String::as_str).collect();
    let mut out = format!("Available themes: {}", shown.join(", "));
    if themes.len() > THEME_SAMPLE {
        let _ = write!(
            out,
            "\n   ... and {} more (use '{} list' to see all)",
            themes.len() - THEME_SAMPLE,
            tool
        );
    }
    Some(out)
}
