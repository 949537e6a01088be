//! Terminal implementations of the core prompt and reporter seams.

use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wallpaper_manager_core::report::{BatchKind, Reporter};
use wallpaper_manager_core::workflow::Prompt;
use wallpaper_manager_core::{display_name, BatchReport, Error, JobResult, Result};

/// Reads answers from stdin
///
/// `awaiting_input` is raised while blocked on stdin so the interrupt handler
/// can tell a prompt apart from a running batch.
pub struct ConsolePrompt {
    awaiting_input: Arc<AtomicBool>,
}

impl ConsolePrompt {
    pub fn new(awaiting_input: Arc<AtomicBool>) -> Self {
        Self { awaiting_input }
    }

    /// Print `question` and read one trimmed line; end of input counts as an interrupt
    pub fn read_line(&self, question: &str) -> Result<String> {
        print!("{}", question);
        io::stdout().flush()?;

        let mut line = String::new();
        self.awaiting_input.store(true, Ordering::SeqCst);
        let read = io::stdin().lock().read_line(&mut line);
        self.awaiting_input.store(false, Ordering::SeqCst);

        if read? == 0 {
            println!();
            return Err(Error::Interrupted);
        }
        Ok(line.trim().to_string())
    }
}

impl Prompt for ConsolePrompt {
    fn confirm(&self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let answer = self
                .read_line(&format!("{} [{}]: ", question, hint))?
                .to_lowercase();
            match answer.as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("Please answer 'y' or 'n'"),
            }
        }
    }

    fn ask(&self, question: &str, default: &str) -> Result<String> {
        let answer = self.read_line(&format!("{} (default: {}): ", question, default))?;
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }
}

/// Prints messages and drives one progress bar per batch
#[derive(Default)]
pub struct ConsoleReporter {
    bar: RefCell<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .map(|style| style.progress_chars("##-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl Reporter for ConsoleReporter {
    fn message(&self, text: &str) {
        match self.bar.borrow().as_ref() {
            Some(bar) => bar.println(text),
            None => println!("{}", text),
        }
    }

    fn batch_started(&self, kind: &BatchKind, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(Self::style());
        bar.set_message(match kind {
            BatchKind::Upscale => "Upscaling".to_string(),
            BatchKind::Theme(name) => format!("Converting to '{}'", name),
        });
        *self.bar.borrow_mut() = Some(bar);
    }

    fn group_started(&self, scale: u32, count: usize) {
        self.message(&format!("\nUpscaling {} images by {}x...", count, scale));
    }

    fn job_started(&self, index: usize, total: usize, name: &str) {
        if let Some(bar) = self.bar.borrow().as_ref() {
            bar.set_message(format!("[{}/{}] {}", index, total, name));
        }
    }

    fn job_finished(&self, result: &JobResult) {
        if let Some(bar) = self.bar.borrow().as_ref() {
            if let JobResult::Failure { source, failure } = result {
                bar.println(format!("  x {}: {}", display_name(source), failure.message));
            }
            bar.inc(1);
        }
    }

    fn batch_finished(&self, _report: &BatchReport) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for ConsoleReporter {
    // An interrupted batch never reaches batch_finished
    fn drop(&mut self) {
        if let Some(bar) = self.bar.get_mut().take() {
            bar.abandon();
        }
    }
}
