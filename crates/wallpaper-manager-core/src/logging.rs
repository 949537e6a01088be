use log::{debug, info, warn};
use std::path::Path;

use crate::types::{Failed, Job};

/// Log file operation that failed
pub fn log_file_error(path: &Path, operation: &str, error: &dyn std::error::Error) {
    warn!(
        "File operation failed - Operation: {}, Path: {}, Error: {}",
        operation,
        path.display(),
        error
    );
}

/// Log an external tool job that did not produce its output
///
/// Info level: the reporter prints failures for the user.
pub fn log_job_failure(job: &Job, failure: &Failed) {
    info!(
        "Job failed - Spec: {:?}, Path: {}, Kind: {:?}, Error: {}",
        job.spec,
        job.source.display(),
        failure.kind,
        failure.message
    );
}

/// Log the command line and captured streams of a tool invocation
pub fn log_tool_output(command: &str, code: Option<i32>, stdout: &str, stderr: &str) {
    debug!("Command: {}", command);
    if !stdout.trim().is_empty() {
        debug!("stdout: {}", stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        debug!("stderr: {}", stderr.trim_end());
    }
    debug!("return code: {:?}", code);
}

/// Log file system modification
pub fn log_fs_modification(operation: &str, path: &Path, details: Option<&str>) {
    let details_str = details.unwrap_or("");
    info!(
        "FS CHANGE - Operation: {}, Path: {}{}",
        operation,
        path.display(),
        if details_str.is_empty() {
            "".to_string()
        } else {
            format!(", Details: {}", details_str)
        }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureKind;
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::sync::Mutex;

    struct Capture(Mutex<Vec<(Level, String)>>);

    impl Log for Capture {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));

    #[test]
    fn test_job_failure_is_not_logged_as_warning() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(LevelFilter::Trace);

        let job = Job::theme("walls/failing-theme.png", "nord");
        let failure = Failed {
            source: job.source.clone(),
            kind: FailureKind::Exit,
            message: "returncode=1".to_string(),
        };
        log_job_failure(&job, &failure);

        let lines = CAPTURE.0.lock().unwrap();
        let (level, _) = lines
            .iter()
            .find(|(_, text)| text.contains("failing-theme.png"))
            .unwrap();
        assert_eq!(*level, Level::Info);
    }
}
