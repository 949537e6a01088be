// External tool invocation
pub mod job;
pub mod process;

pub use job::{evaluate_exit, job_args, JobRunner};
pub use process::{run_with_timeout, ProcessOutcome};
