//! Sequential execution of external tool jobs.
//!
//! One job runs at a time, in the order given. A failed job is recorded and
//! the batch moves on; only cancellation stops a batch early, and then no
//! partial report is returned.

use log::info;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::grouping::{group_by_scale, upscale_jobs};
use crate::logging::log_job_failure;
use crate::processing::JobRunner;
use crate::report::{BatchKind, Reporter};
use crate::types::{BatchReport, ImageRecord, Job};

pub struct BatchOrchestrator<'a> {
    runner: &'a dyn JobRunner,
    reporter: &'a dyn Reporter,
    cancel: CancelToken,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(runner: &'a dyn JobRunner, reporter: &'a dyn Reporter, cancel: CancelToken) -> Self {
        Self {
            runner,
            reporter,
            cancel,
        }
    }

    /// Run jobs one after another and partition their results
    pub fn run_batch(&self, kind: &BatchKind, jobs: &[Job]) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        if jobs.is_empty() {
            return Ok(report);
        }

        let total = jobs.len();
        info!("Starting batch of {} jobs ({:?})", total, kind);
        self.reporter.batch_started(kind, total);

        let mut current_scale = None;
        for (index, job) in jobs.iter().enumerate() {
            self.check_cancelled()?;

            let scale = job.spec.scale();
            if scale.is_some() && scale != current_scale {
                let count = jobs[index..]
                    .iter()
                    .take_while(|j| j.spec.scale() == scale)
                    .count();
                if let Some(scale) = scale {
                    self.reporter.group_started(scale, count);
                }
                current_scale = scale;
            }

            self.reporter.job_started(index + 1, total, &job.name());
            let result = self.runner.run(job, &self.cancel);
            self.reporter.job_finished(&result);

            // A job killed by cancellation is not a real failure
            self.check_cancelled()?;

            let failed = !result.is_success();
            report.push(result);
            if failed {
                if let Some(failure) = report.failures.last() {
                    log_job_failure(job, failure);
                }
            }
        }

        info!(
            "Batch completed: {} successful, {} failed",
            report.successes.len(),
            report.failures.len()
        );
        self.reporter.batch_finished(&report);
        Ok(report)
    }

    /// Group the upscalable records by factor and upscale them, smallest factor first
    pub fn batch_upscale(&self, records: &[ImageRecord], max_factor: u32) -> Result<BatchReport> {
        let groups = group_by_scale(records, max_factor);
        let jobs = upscale_jobs(&groups);
        self.run_batch(&BatchKind::Upscale, &jobs)
    }

    /// Convert every record to the theme, in the given order
    pub fn batch_convert_theme(&self, records: &[ImageRecord], theme: &str) -> Result<BatchReport> {
        let jobs: Vec<Job> = records
            .iter()
            .map(|r| Job::theme(r.path.clone(), theme))
            .collect();
        self.run_batch(&BatchKind::Theme(theme.to_string()), &jobs)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!("Batch cancelled by user");
            return Err(Error::Interrupted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, FailureKind, JobResult};
    use std::cell::RefCell;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
    }

    impl Reporter for Recorder {
        fn message(&self, text: &str) {
            self.events.borrow_mut().push(format!("msg {}", text));
        }

        fn group_started(&self, scale: u32, count: usize) {
            self.events
                .borrow_mut()
                .push(format!("group {}x {}", scale, count));
        }

        fn job_started(&self, index: usize, total: usize, name: &str) {
            self.events
                .borrow_mut()
                .push(format!("[{}/{}] {}", index, total, name));
        }
    }

    fn record(name: &str, scale_needed: f64) -> ImageRecord {
        ImageRecord {
            path: PathBuf::from(name),
            width: 100,
            height: 100,
            scale_needed,
            category: Category::from_scale(scale_needed, 4),
        }
    }

    fn succeed(job: &Job) -> JobResult {
        JobResult::Success {
            source: job.source.clone(),
            output: job.output_path(),
        }
    }

    #[test]
    fn test_empty_batch_does_not_invoke_runner() {
        let calls = RefCell::new(0);
        let runner = |job: &Job| {
            *calls.borrow_mut() += 1;
            succeed(job)
        };
        let reporter = Recorder::default();
        let orchestrator = BatchOrchestrator::new(&runner, &reporter, CancelToken::new());

        let report = orchestrator.run_batch(&BatchKind::Upscale, &[]).unwrap();

        assert!(report.is_empty());
        assert_eq!(*calls.borrow(), 0);
        assert!(reporter.events.borrow().is_empty());
    }

    #[test]
    fn test_failure_does_not_stop_the_batch() {
        let calls = RefCell::new(Vec::new());
        let runner = |job: &Job| {
            calls.borrow_mut().push(job.name());
            if job.name() == "b.png" {
                JobResult::failure(job.source.clone(), FailureKind::Exit, "returncode=1")
            } else {
                succeed(job)
            }
        };
        let orchestrator =
            BatchOrchestrator::new(&runner, &crate::report::NullReporter, CancelToken::new());

        let records = vec![
            record("a.png", 0.5),
            record("b.png", 0.5),
            record("c.png", 0.5),
            record("d.png", 0.5),
        ];
        let report = orchestrator.batch_convert_theme(&records, "nord").unwrap();

        assert_eq!(*calls.borrow(), vec!["a.png", "b.png", "c.png", "d.png"]);
        assert_eq!(report.successes.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, PathBuf::from("b.png"));
        assert_eq!(report.successes[2].output, PathBuf::from("d_nord.png"));
    }

    #[test]
    fn test_upscale_reports_groups_in_ascending_order() {
        let runner = succeed;
        let reporter = Recorder::default();
        let orchestrator = BatchOrchestrator::new(&runner, &reporter, CancelToken::new());

        let records = vec![
            record("big.png", 3.5),
            record("good.png", 0.9),
            record("small.png", 1.5),
            record("mid.png", 2.5),
            record("small2.png", 2.0),
        ];
        let report = orchestrator.batch_upscale(&records, 4).unwrap();

        assert_eq!(report.successes.len(), 4);
        assert_eq!(
            *reporter.events.borrow(),
            vec![
                "group 2x 2",
                "[1/4] small.png",
                "[2/4] small2.png",
                "group 3x 1",
                "[3/4] mid.png",
                "group 4x 1",
                "[4/4] big.png",
            ]
        );
    }

    #[test]
    fn test_cancellation_stops_between_jobs() {
        let cancel = CancelToken::new();
        let calls = RefCell::new(0);
        let token = cancel.clone();
        let runner = |job: &Job| {
            *calls.borrow_mut() += 1;
            if *calls.borrow() == 2 {
                token.cancel();
            }
            succeed(job)
        };
        let orchestrator = BatchOrchestrator::new(&runner, &crate::report::NullReporter, cancel);

        let records = vec![record("a.png", 0.5), record("b.png", 0.5), record("c.png", 0.5)];
        let result = orchestrator.batch_convert_theme(&records, "nord");

        assert!(matches!(result, Err(Error::Interrupted)));
        assert_eq!(*calls.borrow(), 2);
    }
}
