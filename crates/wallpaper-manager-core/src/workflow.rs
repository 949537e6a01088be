//! User-facing workflows: what to run, and what to do with the results.
//!
//! Every destructive step asks for confirmation first. Declining keeps the
//! original and the generated file side by side.

use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::actions::{delete_existing, delete_files, replace_original};
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::discovery::{scan, ImageProbe};
use crate::error::Result;
use crate::orchestrator::BatchOrchestrator;
use crate::processing::JobRunner;
use crate::report::{batch_summary, Reporter};
use crate::types::{BatchReport, Failed, FailureKind, ImageRecord, Inventory, Produced};

/// Synchronous questions to the user
pub trait Prompt {
    /// Yes/no question; an empty answer picks `default`
    fn confirm(&self, question: &str, default: bool) -> Result<bool>;

    /// Free-text question; an empty answer picks `default`
    fn ask(&self, question: &str, default: &str) -> Result<String>;
}

/// The compound operations offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Upscale,
    Theme,
    UpscaleAndTheme,
    DeleteTooLow,
}

/// What a workflow did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub upscale: Option<BatchReport>,
    pub theme: Option<BatchReport>,
    /// Originals replaced by generated files
    pub replaced: usize,
    /// Originals deleted (failed upscales or too-low images)
    pub deleted: usize,
    /// Intermediate upscaled files removed
    pub intermediates_removed: usize,
}

pub struct Workflow<'a> {
    config: &'a Config,
    probe: &'a dyn ImageProbe,
    runner: &'a dyn JobRunner,
    prompt: &'a dyn Prompt,
    reporter: &'a dyn Reporter,
    cancel: CancelToken,
}

impl<'a> Workflow<'a> {
    pub fn new(
        config: &'a Config,
        probe: &'a dyn ImageProbe,
        runner: &'a dyn JobRunner,
        prompt: &'a dyn Prompt,
        reporter: &'a dyn Reporter,
        cancel: CancelToken,
    ) -> Self {
        Self {
            config,
            probe,
            runner,
            prompt,
            reporter,
            cancel,
        }
    }

    fn orchestrator(&self) -> BatchOrchestrator<'_> {
        BatchOrchestrator::new(self.runner, self.reporter, self.cancel.clone())
    }

    /// Scan the collection with the configured target and filters
    pub fn scan(&self, root: &Path) -> Result<Inventory> {
        self.reporter.message(&format!("Scanning {}...", root.display()));
        let inventory = scan(root, self.config, self.probe)?;
        for skipped in &inventory.errors {
            self.reporter.message(&format!(
                "Error reading {}: {}",
                skipped.path.display(),
                skipped.message
            ));
        }
        Ok(inventory)
    }

    /// Run one action, then offer to delete too-low images for the processing actions
    pub fn execute(
        &self,
        action: Action,
        inventory: &Inventory,
        theme: Option<&str>,
    ) -> Result<WorkflowOutcome> {
        if inventory.is_empty() {
            self.reporter.message("No images found in directory.");
            return Ok(WorkflowOutcome::default());
        }

        let theme = theme.unwrap_or(self.config.default_theme.as_str());
        let mut outcome = match action {
            Action::Upscale => self.upscale_only(inventory)?,
            Action::Theme => self.theme_only(inventory, theme)?,
            Action::UpscaleAndTheme => self.upscale_then_theme(inventory, theme)?,
            Action::DeleteTooLow => {
                return Ok(WorkflowOutcome {
                    deleted: self.delete_too_low(inventory)?,
                    ..Default::default()
                })
            }
        };

        outcome.deleted += self.offer_delete_too_low(inventory)?;
        Ok(outcome)
    }

    /// Upscale the upscalable images, then optionally replace originals and
    /// delete the ones that failed
    pub fn upscale_only(&self, inventory: &Inventory) -> Result<WorkflowOutcome> {
        let report = self.upscale(inventory)?;
        let mut outcome = WorkflowOutcome::default();

        if report.successes.is_empty() {
            self.reporter.message("No images were successfully upscaled.");
            outcome.upscale = Some(report);
            return Ok(outcome);
        }

        outcome.replaced = self.offer_replace(
            "Replace original files with upscaled versions?",
            "upscaled",
            &direct_targets(&report.successes),
        )?;

        if !report.failures.is_empty()
            && self.prompt.confirm(
                &format!("Delete {} files that failed upscaling?", report.failures.len()),
                false,
            )?
        {
            outcome.deleted = delete_files(report.failures.iter().map(|f| f.source.as_path()))?;
            self.reporter
                .message(&format!("Deleted {} failed images.", outcome.deleted));
        }

        outcome.upscale = Some(report);
        Ok(outcome)
    }

    /// Convert every image to the theme, then optionally replace originals
    pub fn theme_only(&self, inventory: &Inventory, theme: &str) -> Result<WorkflowOutcome> {
        let report = self.convert(&inventory.records, theme)?;
        let mut outcome = WorkflowOutcome::default();

        if report.successes.is_empty() {
            self.reporter.message("No images were successfully converted.");
        } else {
            outcome.replaced = self.offer_replace(
                "Replace original files with converted versions?",
                "converted",
                &direct_targets(&report.successes),
            )?;
        }

        outcome.theme = Some(report);
        Ok(outcome)
    }

    /// Upscale what needs it, then theme the good images plus the upscaled outputs
    ///
    /// Themed versions of upscaled outputs replace the original image, which
    /// leaves the upscaled intermediate unreferenced and removable. Cleanup is
    /// only offered once that replace happened; otherwise the intermediate is
    /// the only upscaled copy next to its themed output.
    pub fn upscale_then_theme(&self, inventory: &Inventory, theme: &str) -> Result<WorkflowOutcome> {
        self.reporter.message("Step 1: Upscaling images that need it...");
        let upscale_report = self.upscale(inventory)?;

        let (promoted, unreadable) = self.promote_outputs(&upscale_report.successes);
        let mut to_convert = inventory.good();
        to_convert.extend(promoted);

        let mut outcome = WorkflowOutcome::default();
        if to_convert.is_empty() {
            self.reporter.message("No images available for theme conversion.");
            if !unreadable.is_empty() {
                outcome.theme = Some(BatchReport {
                    successes: Vec::new(),
                    failures: unreadable,
                });
            }
            outcome.upscale = Some(upscale_report);
            return Ok(outcome);
        }

        self.reporter.message(&format!(
            "Step 2: Converting {} images to '{}' theme...",
            to_convert.len(),
            theme
        ));
        let mut theme_report = self.orchestrator().batch_convert_theme(&to_convert, theme)?;
        theme_report.failures.extend(unreadable);
        self.summarize("converted", &theme_report);

        if !theme_report.successes.is_empty() {
            // Intermediate -> the original it was upscaled from
            let origin: HashMap<&Path, &Path> = upscale_report
                .successes
                .iter()
                .map(|p| (p.output.as_path(), p.source.as_path()))
                .collect();

            let targets: Vec<(PathBuf, PathBuf)> = theme_report
                .successes
                .iter()
                .map(|p| {
                    let target = origin
                        .get(p.source.as_path())
                        .copied()
                        .unwrap_or(p.source.as_path());
                    (target.to_path_buf(), p.output.clone())
                })
                .collect();

            outcome.replaced = self.offer_replace(
                "Replace files with theme-converted versions?",
                "themed",
                &targets,
            )?;

            let consumed: Vec<&Path> = theme_report
                .successes
                .iter()
                .filter(|p| origin.contains_key(p.source.as_path()))
                .map(|p| p.source.as_path())
                .collect();

            if outcome.replaced > 0
                && !consumed.is_empty()
                && self
                    .prompt
                    .confirm("Remove intermediate upscaled versions?", true)?
            {
                outcome.intermediates_removed = delete_existing(consumed)?;
                self.reporter.message(&format!(
                    "Cleaned up {} intermediate files.",
                    outcome.intermediates_removed
                ));
            }
        }

        outcome.upscale = Some(upscale_report);
        outcome.theme = Some(theme_report);
        Ok(outcome)
    }

    /// Confirm and delete every too-low image
    pub fn delete_too_low(&self, inventory: &Inventory) -> Result<usize> {
        let too_low = inventory.too_low();
        if too_low.is_empty() {
            self.reporter.message("No images are too low quality.");
            return Ok(0);
        }

        if !self.prompt.confirm(
            &format!("Delete {} images that are too low quality?", too_low.len()),
            false,
        )? {
            return Ok(0);
        }

        let deleted = delete_files(too_low.iter().map(|r| r.path.as_path()))?;
        self.reporter.message(&format!("Deleted {} images.", deleted));
        Ok(deleted)
    }

    /// Follow-up offered after processing: delete images that cannot be upscaled
    pub fn offer_delete_too_low(&self, inventory: &Inventory) -> Result<usize> {
        let too_low = inventory.too_low();
        if too_low.is_empty()
            || !self.prompt.confirm(
                &format!("Delete {} images too low quality to upscale?", too_low.len()),
                false,
            )?
        {
            return Ok(0);
        }

        let deleted = delete_files(too_low.iter().map(|r| r.path.as_path()))?;
        self.reporter
            .message(&format!("Deleted {} low-quality images.", deleted));
        Ok(deleted)
    }

    fn upscale(&self, inventory: &Inventory) -> Result<BatchReport> {
        let upscalable = inventory.upscalable();
        if upscalable.is_empty() {
            self.reporter.message("No images need upscaling.");
            return Ok(BatchReport::default());
        }

        self.reporter.message(&format!(
            "Starting upscaling of {} images...",
            upscalable.len()
        ));
        let report = self
            .orchestrator()
            .batch_upscale(&upscalable, self.config.max_upscale_factor)?;
        self.summarize("upscaled", &report);
        Ok(report)
    }

    fn convert(&self, records: &[ImageRecord], theme: &str) -> Result<BatchReport> {
        self.reporter.message(&format!(
            "Converting {} images to '{}' theme...",
            records.len(),
            theme
        ));
        let report = self.orchestrator().batch_convert_theme(records, theme)?;
        self.summarize("converted", &report);
        Ok(report)
    }

    /// Re-probe upscaled outputs; unreadable ones become failures
    fn promote_outputs(&self, produced: &[Produced]) -> (Vec<ImageRecord>, Vec<Failed>) {
        let mut promoted = Vec::new();
        let mut unreadable = Vec::new();

        for p in produced {
            match self.probe.probe(&p.output) {
                Ok((width, height)) => {
                    promoted.push(ImageRecord::promoted(p.output.clone(), width, height))
                }
                Err(e) => {
                    info!("Upscaled output {} is unreadable: {}", p.output.display(), e);
                    unreadable.push(Failed {
                        source: p.output.clone(),
                        kind: FailureKind::Unreadable,
                        message: format!("could not read upscaled output: {}", e),
                    });
                }
            }
        }

        (promoted, unreadable)
    }

    fn summarize(&self, verb: &str, report: &BatchReport) {
        self.reporter
            .message(&batch_summary(verb, report, !self.config.verbose));
    }

    /// Ask once, then replace every (target, produced) pair or keep both
    fn offer_replace(
        &self,
        question: &str,
        noun: &str,
        pairs: &[(PathBuf, PathBuf)],
    ) -> Result<usize> {
        if !self.prompt.confirm(question, false)? {
            self.reporter.message(&format!(
                "Kept both versions ({} {} files saved).",
                pairs.len(),
                noun
            ));
            return Ok(0);
        }

        for (target, produced) in pairs {
            replace_original(target, produced)?;
        }
        self.reporter
            .message(&format!("Replaced {} original files.", pairs.len()));
        Ok(pairs.len())
    }
}

fn direct_targets(successes: &[Produced]) -> Vec<(PathBuf, PathBuf)> {
    successes
        .iter()
        .map(|p| (p.source.clone(), p.output.clone()))
        .collect()
}
