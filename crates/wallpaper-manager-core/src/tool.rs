//! The external image tool: availability checks, theme listing and its
//! configuration file.

use log::{debug, info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::log_fs_modification;
use crate::processing::process::{run_with_timeout, ProcessOutcome};

/// Setting that stops the tool from opening a preview window per image
pub const PREVIEW_DISABLED_SETTING: &str = "EnableImagePreviewing: false";

/// Lines of `list` output starting with these words are headers
const THEME_LIST_HEADERS: [&str; 2] = ["Available", "Custom"];

/// Source of theme names the user can pick from
pub trait ThemeSource {
    fn themes(&self) -> Vec<String>;
}

/// Handle on the external tool executable
#[derive(Debug, Clone)]
pub struct ExternalTool {
    program: PathBuf,
    job_timeout: Duration,
    query_timeout: Duration,
}

impl ExternalTool {
    pub fn new(program: impl Into<PathBuf>, job_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            job_timeout,
            query_timeout: Duration::from_secs(5),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.tool, config.job_timeout()).with_query_timeout(config.list_timeout())
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn job_timeout(&self) -> Duration {
        self.job_timeout
    }

    pub fn command(&self) -> Command {
        Command::new(&self.program)
    }

    /// Run a short query such as `--version`, returning (success, stdout, stderr)
    fn query(&self, args: &[&str]) -> Result<(bool, String, String)> {
        let mut cmd = self.command();
        cmd.args(args);

        match run_with_timeout(&mut cmd, self.query_timeout, &CancelToken::new())? {
            ProcessOutcome::Exited {
                status,
                stdout,
                stderr,
            } => Ok((status.success(), stdout, stderr)),
            ProcessOutcome::TimedOut { .. } => Err(Error::ToolUnavailable(format!(
                "'{} {}' timed out",
                self.program.display(),
                args.join(" ")
            ))),
            ProcessOutcome::Cancelled => Err(Error::Interrupted),
        }
    }

    /// Make sure the tool exists and answers `--version`
    ///
    /// Returns the reported version text. A failing `--help` is only logged.
    pub fn check_available(&self) -> Result<String> {
        let resolved = which::which(&self.program).map_err(|e| {
            Error::ToolUnavailable(format!("'{}' not found: {}", self.program.display(), e))
        })?;
        debug!("Resolved {} to {}", self.program.display(), resolved.display());

        let (ok, stdout, stderr) = self.query(&["--version"]).map_err(|e| match e {
            Error::Io(io) => Error::ToolUnavailable(format!(
                "failed to run '{}': {}",
                self.program.display(),
                io
            )),
            other => other,
        })?;
        if !ok {
            return Err(Error::ToolUnavailable(format!(
                "'{} --version' failed: {}",
                self.program.display(),
                stderr.trim()
            )));
        }

        match self.query(&["--help"]) {
            Ok((true, _, _)) => debug!("{} is responding correctly", self.program.display()),
            Ok((false, _, stderr)) => warn!(
                "{} --help returned an error: {}",
                self.program.display(),
                stderr.trim()
            ),
            Err(e) => warn!("Could not test {}: {}", self.program.display(), e),
        }

        let version = stdout.trim();
        Ok(if version.is_empty() {
            "version check passed".to_string()
        } else {
            version.to_string()
        })
    }
}

impl ThemeSource for ExternalTool {
    /// Best effort: any failure yields an empty list
    fn themes(&self) -> Vec<String> {
        match self.query(&["list"]) {
            Ok((true, stdout, _)) => parse_theme_list(&stdout),
            Ok((false, _, stderr)) => {
                debug!("theme listing failed: {}", stderr.trim());
                Vec::new()
            }
            Err(e) => {
                debug!("theme listing failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// First word of every non-header line of `list` output
pub fn parse_theme_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !THEME_LIST_HEADERS.iter().any(|h| line.starts_with(h)))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Default location of the tool's configuration file
pub fn default_tool_config_path(tool: &str) -> Option<PathBuf> {
    let name = Path::new(tool).file_name()?.to_string_lossy().into_owned();
    dirs::home_dir().map(|home| home.join(".config").join(name).join("config.yml"))
}

/// Append the preview-disabled setting unless it is already present
///
/// Returns `true` when the file was changed. Existing content is never rewritten.
pub fn ensure_preview_disabled(config_file: &Path) -> Result<bool> {
    if let Some(parent) = config_file.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::file_op("create", parent, e))?;
    }

    let existing = match fs::read_to_string(config_file) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::file_op("read", config_file, e)),
    };

    if existing.lines().any(|line| line.trim() == PREVIEW_DISABLED_SETTING) {
        return Ok(false);
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config_file)
        .map_err(|e| Error::file_op("open", config_file, e))?;

    let mut addition = String::new();
    if !existing.is_empty() {
        addition.push('\n');
    }
    addition.push_str("# Added by wallpaper-manager for batch processing\n");
    addition.push_str(PREVIEW_DISABLED_SETTING);
    addition.push('\n');

    file.write_all(addition.as_bytes())
        .map_err(|e| Error::file_op("write", config_file, e))?;

    log_fs_modification("append", config_file, Some(PREVIEW_DISABLED_SETTING));
    info!("Disabled image preview in {}", config_file.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_theme_list_skips_headers() {
        let output = "Available themes:\n  catppuccin\n  dracula   A dark theme\n\n  nord\nCustom themes:\n  mytheme (custom)\n";
        assert_eq!(
            parse_theme_list(output),
            vec!["catppuccin", "dracula", "nord", "mytheme"]
        );
    }

    #[test]
    fn test_parse_theme_list_empty() {
        assert!(parse_theme_list("").is_empty());
        assert!(parse_theme_list("Available themes:\n").is_empty());
    }

    #[test]
    fn test_ensure_preview_disabled_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gowall").join("config.yml");

        assert!(ensure_preview_disabled(&path).unwrap());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Added by"));
        assert!(content.contains(PREVIEW_DISABLED_SETTING));
    }

    #[test]
    fn test_ensure_preview_disabled_is_idempotent_and_keeps_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "OutputFolder: /tmp/walls").unwrap();

        assert!(ensure_preview_disabled(&path).unwrap());
        assert!(!ensure_preview_disabled(&path).unwrap());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("OutputFolder: /tmp/walls\n"));
        assert_eq!(content.matches(PREVIEW_DISABLED_SETTING).count(), 1);
    }

    #[test]
    fn test_missing_tool_is_unavailable() {
        let tool = ExternalTool::new("definitely-not-an-installed-tool", Duration::from_secs(1));
        assert!(matches!(tool.check_available(), Err(Error::ToolUnavailable(_))));
        assert!(tool.themes().is_empty());
    }

    #[test]
    fn test_default_tool_config_path() {
        if let Some(path) = default_tool_config_path("gowall") {
            assert!(path.ends_with(".config/gowall/config.yml"));
        }
    }
}
