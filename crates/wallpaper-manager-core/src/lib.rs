//! Core functionality for auditing and improving a wallpaper collection.
//!
//! This library provides the building blocks of the wallpaper manager:
//! - Image discovery and resolution classification against a target
//! - Grouping of upscalable images by integer scale factor
//! - Sequential execution of an external tool with per-job timeouts
//! - Confirmed file replacement and deletion

// -- External Dependencies --
use log::{info, warn};
use std::path::Path;

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use cancel::CancelToken;
pub use config::*;
pub use error::{Error, Result};
pub use types::*;

// -- Public Modules --
pub mod actions;
pub mod cancel;
pub mod classify;
pub mod config;
pub mod discovery;
pub mod grouping;
pub mod logging;
pub mod orchestrator;
pub mod processing;
pub mod report;
pub mod tool;
pub mod types;
pub mod workflow;

use discovery::ImageDimensionsProbe;
use report::Reporter;
use tool::{ExternalTool, ThemeSource};
use workflow::{Action, Prompt, Workflow, WorkflowOutcome};

/// Main entry point for a wallpaper maintenance session
pub struct WallpaperManager {
    config: Config,
    tool: ExternalTool,
    cancel: CancelToken,
}

impl WallpaperManager {
    /// Create a manager for a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let tool = ExternalTool::from_config(&config);

        Ok(Self {
            config,
            tool,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Switch verbose reporting on or off after construction
    pub fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
    }

    /// Token shared with every run started by this manager
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Verify the tool and turn off its per-image preview window
    ///
    /// A missing tool is an error; failing to edit its config file is only a warning.
    pub fn prepare_tool(&self) -> Result<String> {
        let version = self.tool.check_available()?;
        info!("{} is available: {}", self.config.tool, version);

        match tool::default_tool_config_path(&self.config.tool) {
            Some(path) => match tool::ensure_preview_disabled(&path) {
                Ok(true) => info!("Disabled image previewing in {}", path.display()),
                Ok(false) => {}
                Err(e) => warn!("Could not update {}: {}", path.display(), e),
            },
            None => warn!("No home directory; leaving tool previews enabled"),
        }

        Ok(version)
    }

    /// Theme names offered by the tool, empty when it cannot list them
    pub fn available_themes(&self) -> Vec<String> {
        self.tool.themes()
    }

    /// Discover and classify images under `root`
    pub fn scan(&self, root: &Path) -> Result<Inventory> {
        info!("Scanning {} for images...", root.display());
        let inventory = discovery::scan(root, &self.config, &ImageDimensionsProbe)?;
        info!(
            "Found {} images ({} unreadable)",
            inventory.len(),
            inventory.errors.len()
        );
        Ok(inventory)
    }

    /// Run an action on a scanned collection
    pub fn run(
        &self,
        action: Action,
        inventory: &Inventory,
        theme: Option<&str>,
        prompt: &dyn Prompt,
        reporter: &dyn Reporter,
    ) -> Result<WorkflowOutcome> {
        let workflow = Workflow::new(
            &self.config,
            &ImageDimensionsProbe,
            &self.tool,
            prompt,
            reporter,
            self.cancel.clone(),
        );
        workflow.execute(action, inventory, theme)
    }
}
