use log::debug;
use std::ffi::OsString;
use std::path::Path;
use std::process::ExitStatus;

use crate::cancel::CancelToken;
use crate::logging::log_tool_output;
use crate::processing::process::{run_with_timeout, ProcessOutcome};
use crate::tool::ExternalTool;
use crate::types::{FailureKind, Job, JobResult, JobSpec};

/// Executes a single job; a failed job is data, never an error
pub trait JobRunner {
    fn run(&self, job: &Job, cancel: &CancelToken) -> JobResult;
}

/// Closures stand in for the tool, mostly in tests
impl<F> JobRunner for F
where
    F: Fn(&Job) -> JobResult,
{
    fn run(&self, job: &Job, _cancel: &CancelToken) -> JobResult {
        self(job)
    }
}

/// Arguments after the program name for a job
pub fn job_args(job: &Job) -> Vec<OsString> {
    let output = job.output_path();
    let (mode, flag, value) = match &job.spec {
        JobSpec::Upscale { scale } => ("upscale", "-s", scale.to_string()),
        JobSpec::Theme { name } => ("convert", "-t", name.clone()),
    };

    vec![
        mode.into(),
        job.source.clone().into_os_string(),
        flag.into(),
        value.into(),
        "--output".into(),
        output.into_os_string(),
    ]
}

/// Turn a finished process into a job result
///
/// Success needs both a zero exit status and the output file on disk.
pub fn evaluate_exit(
    job: &Job,
    status: &ExitStatus,
    stderr: &str,
    output_exists: bool,
) -> JobResult {
    let output = job.output_path();
    if status.success() && output_exists {
        return JobResult::Success {
            source: job.source.clone(),
            output,
        };
    }

    let mut message = match status.code() {
        Some(code) => format!("returncode={}", code),
        None => "terminated by signal".to_string(),
    };
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        message.push_str(&format!(", stderr={}", stderr));
    }
    if !output_exists {
        message.push_str(", output file not created");
    }

    let kind = if status.success() {
        FailureKind::MissingOutput
    } else {
        FailureKind::Exit
    };

    JobResult::failure(job.source.clone(), kind, message)
}

impl ExternalTool {
    /// Upscale one image by an integer factor
    pub fn run_upscale(&self, path: &Path, scale: u32, cancel: &CancelToken) -> JobResult {
        self.run(&Job::upscale(path, scale), cancel)
    }

    /// Recolor one image to a named theme
    pub fn run_theme_convert(&self, path: &Path, theme: &str, cancel: &CancelToken) -> JobResult {
        self.run(&Job::theme(path, theme), cancel)
    }
}

impl JobRunner for ExternalTool {
    fn run(&self, job: &Job, cancel: &CancelToken) -> JobResult {
        let args = job_args(job);
        let mut cmd = self.command();
        cmd.args(&args);

        let command_line = format!(
            "{} {}",
            self.program().display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        match run_with_timeout(&mut cmd, self.job_timeout(), cancel) {
            Ok(ProcessOutcome::Exited {
                status,
                stdout,
                stderr,
            }) => {
                log_tool_output(&command_line, status.code(), &stdout, &stderr);
                let output_exists = job.output_path().is_file();
                evaluate_exit(job, &status, &stderr, output_exists)
            }
            Ok(ProcessOutcome::TimedOut { elapsed }) => {
                debug!("{} timed out after {:.1?}", command_line, elapsed);
                JobResult::failure(
                    job.source.clone(),
                    FailureKind::Timeout,
                    format!("Timeout (>{}s)", self.job_timeout().as_secs()),
                )
            }
            Ok(ProcessOutcome::Cancelled) => JobResult::failure(
                job.source.clone(),
                FailureKind::Cancelled,
                "Cancelled by user",
            ),
            Err(e) => {
                debug!("{} could not be run: {}", command_line, e);
                JobResult::failure(
                    job.source.clone(),
                    FailureKind::Spawn,
                    format!("Failed to run {}: {}", self.program().display(), e),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[cfg(unix)]
    fn exit_status(code: i32) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }

    #[test]
    fn test_upscale_args() {
        let job = Job::upscale("/w/a.png", 3);
        let args: Vec<String> = job_args(&job)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["upscale", "/w/a.png", "-s", "3", "--output", "/w/a_upscaled.png"]
        );
    }

    #[test]
    fn test_theme_args() {
        let job = Job::theme("/w/a.jpg", "nord");
        let args: Vec<String> = job_args(&job)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["convert", "/w/a.jpg", "-t", "nord", "--output", "/w/a_nord.jpg"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_success_requires_exit_zero_and_output() {
        let job = Job::upscale("a.png", 2);

        assert_eq!(
            evaluate_exit(&job, &exit_status(0), "", true),
            JobResult::Success {
                source: PathBuf::from("a.png"),
                output: PathBuf::from("a_upscaled.png"),
            }
        );

        match evaluate_exit(&job, &exit_status(0), "", false) {
            JobResult::Failure { failure, .. } => {
                assert_eq!(failure.kind, FailureKind::MissingOutput);
                assert_eq!(failure.message, "returncode=0, output file not created");
            }
            other => panic!("expected failure, got {:?}", other),
        }

        match evaluate_exit(&job, &exit_status(1), "  model not found \n", true) {
            JobResult::Failure { failure, .. } => {
                assert_eq!(failure.kind, FailureKind::Exit);
                assert_eq!(failure.message, "returncode=1, stderr=model not found");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
