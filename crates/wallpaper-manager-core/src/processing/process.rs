//! Run a child process with captured output, a timeout and cancellation.
//!
//! Both pipes are drained on their own threads so a chatty tool can never
//! block on a full pipe buffer while we wait for it to exit. On unix the
//! child leads its own process group, so a wrapper script and everything it
//! forked are signalled together.

use log::{debug, info};
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;

/// How often a running child is polled for exit, timeout and cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Minimum time allowed for the pipes to flush after the child exits
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// How a supervised process ended
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Process exited on its own
    Exited {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    /// Process was killed after running past the timeout
    TimedOut { elapsed: Duration },

    /// Process was killed because the run was cancelled
    Cancelled,
}

/// Spawn `cmd` and wait for it, killing it on timeout or cancellation
///
/// The whole call is bounded by `timeout` (plus a short grace period for the
/// pipes), even when the child leaves descendants holding its output open.
/// Returns `Err` only when the process cannot be spawned or waited on.
pub fn run_with_timeout(
    cmd: &mut Command,
    timeout: Duration,
    cancel: &CancelToken,
) -> io::Result<ProcessOutcome> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    own_process_group(cmd);

    let mut child = cmd.spawn()?;
    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            // Anything still in the group is a leftover holding our pipes
            if let Err(e) = kill_group(&mut child) {
                debug!("no leftovers for process {}: {}", child.id(), e);
            }
            let deadline = (start + timeout).max(Instant::now() + DRAIN_GRACE);
            return Ok(ProcessOutcome::Exited {
                status,
                stdout: collect(&stdout_reader, deadline),
                stderr: collect(&stderr_reader, deadline),
            });
        }

        if cancel.is_cancelled() {
            info!("Cancellation requested, stopping process {}", child.id());
            terminate(&mut child);
            return Ok(ProcessOutcome::Cancelled);
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            info!(
                "TIMEOUT: process {} still running after {} seconds",
                child.id(),
                timeout.as_secs()
            );
            terminate(&mut child);
            return Ok(ProcessOutcome::TimedOut { elapsed });
        }

        thread::sleep(POLL_INTERVAL.min(timeout.saturating_sub(elapsed)));
    }
}

#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

/// SIGKILL every process in the group the child leads
#[cfg(unix)]
fn kill_group(child: &mut Child) -> io::Result<()> {
    let pgid = child.id() as libc::pid_t;
    let ret = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) -> io::Result<()> {
    child.kill()
}

/// Kill the child with its whole group and reap it; the reader threads are
/// left to finish on their own
fn terminate(child: &mut Child) {
    if let Err(e) = kill_group(child) {
        debug!("group kill failed for process {}: {}", child.id(), e);
        if let Err(e) = child.kill() {
            // Already exited between the poll and the kill
            debug!("kill failed for process {}: {}", child.id(), e);
        }
    }
    if let Err(e) = child.wait() {
        debug!("wait failed for process {}: {}", child.id(), e);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });
    }
    rx
}

fn collect(reader: &Receiver<String>, deadline: Instant) -> String {
    match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => text,
        Err(RecvTimeoutError::Timeout) => {
            debug!("output pipe still open at the deadline, dropping it");
            String::new()
        }
        Err(RecvTimeoutError::Disconnected) => String::new(),
    }
}
