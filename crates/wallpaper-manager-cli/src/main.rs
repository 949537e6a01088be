use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, LevelFilter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wallpaper_manager_core::report::{scan_summary, theme_listing, Reporter};
use wallpaper_manager_core::workflow::{Action, Prompt};
use wallpaper_manager_core::{
    CancelToken, Config, Error, Inventory, TargetResolution, WallpaperManager,
};

mod console;

use console::{ConsolePrompt, ConsoleReporter};

const INSTALL_HINT: &str = "Please install gowall first: https://github.com/Achno/gowall";

#[derive(Parser)]
#[command(name = "wallpaper-manager")]
#[command(about = "Audit, upscale and re-theme a wallpaper collection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    settings: Settings,
}

/// Options shared by every subcommand; they override the config file
#[derive(Args)]
struct Settings {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Target resolution, e.g. 2560x1440
    #[arg(long, global = true, value_parser = parse_target)]
    target: Option<TargetResolution>,

    /// Largest upscale factor to attempt
    #[arg(long, global = true)]
    max_factor: Option<u32>,

    /// External tool executable
    #[arg(long, global = true)]
    tool: Option<String>,

    /// Per-image timeout for the external tool, in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory and interactively fix what is found
    Run {
        /// Wallpaper directory
        #[arg(default_value = ".")]
        directory: PathBuf,

        /// Skip the menu and run this action
        #[arg(long, value_enum)]
        action: Option<ActionArg>,

        /// Skip the theme prompt and use this theme
        #[arg(long)]
        theme: Option<String>,
    },

    /// Scan a directory and print the summary only
    Scan {
        /// Wallpaper directory
        #[arg(default_value = ".")]
        directory: PathBuf,
    },

    /// List the themes the external tool knows about
    Themes,

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "wallpaper-manager.json")]
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Upscale,
    Theme,
    Both,
    DeleteLow,
}

impl From<ActionArg> for Action {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Upscale => Action::Upscale,
            ActionArg::Theme => Action::Theme,
            ActionArg::Both => Action::UpscaleAndTheme,
            ActionArg::DeleteLow => Action::DeleteTooLow,
        }
    }
}

fn parse_target(value: &str) -> Result<TargetResolution, String> {
    TargetResolution::parse(value).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.settings.verbose);

    match dispatch(cli) {
        Ok(code) => code,
        Err(e) if is_interrupted(&e) => {
            println!("\n\nOperation cancelled by user.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Run {
            directory,
            action,
            theme,
        } => {
            let config = load_config(&cli.settings)?;
            run(config, &directory, action.map(Action::from), theme, cli.settings.verbose)
        }

        Commands::Scan { directory } => {
            let config = load_config(&cli.settings)?;
            let manager = WallpaperManager::new(config)?;
            let inventory = match scan_directory(&manager, &directory)? {
                Some(inventory) => inventory,
                None => return Ok(ExitCode::FAILURE),
            };

            println!("{}", scan_summary(&inventory, manager.config()));
            for skipped in &inventory.errors {
                println!("Unreadable: {} ({})", skipped.path.display(), skipped.message);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Themes => {
            let config = load_config(&cli.settings)?;
            let manager = WallpaperManager::new(config)?;
            let themes = manager.available_themes();
            if themes.is_empty() {
                println!("No themes reported by {}.", manager.config().tool);
            }
            for theme in themes {
                println!("{}", theme);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Interactive session: checks, scan, menu, workflow
fn run(
    config: Config,
    directory: &Path,
    action: Option<Action>,
    theme: Option<String>,
    verbosity: u8,
) -> anyhow::Result<ExitCode> {
    println!("Wallpaper Quality Manager");
    println!("Target resolution: {}\n", config.target());

    let mut manager = WallpaperManager::new(config)?;
    let awaiting_input = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(manager.cancel_token(), awaiting_input.clone())?;
    let prompt = ConsolePrompt::new(awaiting_input);
    let reporter = ConsoleReporter::new();

    if !directory.is_dir() {
        eprintln!("Error: Directory not found: {}", directory.display());
        return Ok(ExitCode::FAILURE);
    }

    println!("Checking for {}...", manager.config().tool);
    match manager.prepare_tool() {
        Ok(version) => println!("Found {}: {}\n", manager.config().tool, version),
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", INSTALL_HINT);
            return Ok(ExitCode::FAILURE);
        }
    }

    let inventory = match scan_directory(&manager, directory)? {
        Some(inventory) => inventory,
        None => return Ok(ExitCode::FAILURE),
    };
    for skipped in &inventory.errors {
        reporter.message(&format!(
            "Error reading {}: {}",
            skipped.path.display(),
            skipped.message
        ));
    }
    if inventory.is_empty() {
        println!("No images found in directory.");
        return Ok(ExitCode::SUCCESS);
    }
    println!("{}\n", scan_summary(&inventory, manager.config()));

    let action = match action {
        Some(action) => action,
        None if inventory.upscalable().is_empty() && inventory.too_low().is_empty() => {
            println!("All images already meet quality requirements!");
            if !prompt.confirm("Would you like to convert images to a different theme?", false)? {
                return Ok(ExitCode::SUCCESS);
            }
            Action::Theme
        }
        None => match choose_action(&prompt)? {
            Some(action) => action,
            None => return Ok(ExitCode::SUCCESS),
        },
    };

    if action == Action::DeleteTooLow {
        manager.run(action, &inventory, None, &prompt, &reporter)?;
        return Ok(ExitCode::SUCCESS);
    }

    let theme = match (action, theme) {
        (Action::Upscale, _) => None,
        (_, Some(theme)) => Some(theme),
        (_, None) => Some(choose_theme(&manager, &prompt)?),
    };

    if verbosity == 0 && prompt.confirm("Enable verbose logging for debugging?", false)? {
        raise_log_level(LevelFilter::Debug);
        manager.set_verbose(true);
    }

    let outcome = manager.run(action, &inventory, theme.as_deref(), &prompt, &reporter)?;
    debug!("Workflow outcome: {:?}", outcome);

    println!("\nDone! Your wallpaper collection has been optimized.");
    Ok(ExitCode::SUCCESS)
}

/// Scan, printing the error and returning `None` when the directory is missing
fn scan_directory(manager: &WallpaperManager, directory: &Path) -> anyhow::Result<Option<Inventory>> {
    match manager.scan(directory) {
        Ok(inventory) => Ok(Some(inventory)),
        Err(Error::DirectoryNotFound(path)) => {
            eprintln!("Error: Directory not found: {}", path.display());
            Ok(None)
        }
        Err(e) => Err(e).context("scan failed"),
    }
}

/// Main menu; `None` when the user cancels
fn choose_action(prompt: &ConsolePrompt) -> anyhow::Result<Option<Action>> {
    println!("What would you like to do?");
    println!("1. Upscale images that need it");
    println!("2. Convert all images to a theme");
    println!("3. Upscale AND convert to theme");
    println!("4. Delete all low-quality images");
    println!("5. Cancel");

    let choice = prompt.read_line("\nEnter choice (1-5): ")?;
    let action = match choice.as_str() {
        "1" => Action::Upscale,
        "2" => Action::Theme,
        "3" => Action::UpscaleAndTheme,
        "4" => Action::DeleteTooLow,
        "5" => {
            println!("Operation cancelled.");
            return Ok(None);
        }
        other => anyhow::bail!("Invalid choice: '{}'", other),
    };
    Ok(Some(action))
}

fn choose_theme(manager: &WallpaperManager, prompt: &dyn Prompt) -> anyhow::Result<String> {
    let themes = manager.available_themes();
    if let Some(listing) = theme_listing(&themes, &manager.config().tool) {
        println!("\n{}", listing);
    }
    Ok(prompt.ask("\nEnter theme name", &manager.config().default_theme)?)
}

fn load_config(settings: &Settings) -> anyhow::Result<Config> {
    let mut config = match &settings.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(target) = settings.target {
        config.set_target(target);
    }
    if let Some(max_factor) = settings.max_factor {
        config.max_upscale_factor = max_factor;
    }
    if let Some(tool) = &settings.tool {
        config.tool = tool.clone();
    }
    if let Some(timeout) = settings.timeout {
        config.job_timeout_secs = timeout;
    }
    config.verbose = config.verbose || settings.verbose > 0;

    config.validate()?;
    Ok(config)
}

/// Ctrl-C at a prompt exits right away; during a batch it kills the running job
fn install_interrupt_handler(cancel: CancelToken, awaiting_input: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        if awaiting_input.load(Ordering::SeqCst) || cancel.is_cancelled() {
            println!("\n\nOperation cancelled by user.");
            std::process::exit(0);
        }
        eprintln!("\nInterrupted, stopping the current job...");
        cancel.cancel();
    })
    .context("installing Ctrl-C handler")
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let rust_log = std::env::var("RUST_LOG").ok();
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Trace).format_timestamp(None);
    if let Some(filters) = &rust_log {
        builder.parse_filters(filters);
    }
    builder.init();

    // The logger accepts everything; the global maximum does the filtering
    if rust_log.is_none() {
        log::set_max_level(level);
    }
}

fn raise_log_level(level: LevelFilter) {
    if log::max_level() < level {
        log::set_max_level(level);
    }
}

fn is_interrupted(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<Error>(), Some(Error::Interrupted)))
}
