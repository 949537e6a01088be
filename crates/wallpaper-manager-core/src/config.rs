use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Minimum width and height a wallpaper should meet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetResolution {
    pub width: u32,
    pub height: u32,
}

impl TargetResolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse a `WIDTHxHEIGHT` string such as `2560x1440`
    pub fn parse(value: &str) -> Result<Self> {
        let (w, h) = value
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| Error::Configuration(format!("Expected WIDTHxHEIGHT, got '{}'", value)))?;

        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| Error::Configuration(format!("Invalid width '{}': {}", w, e)))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| Error::Configuration(format!("Invalid height '{}': {}", h, e)))?;

        Ok(Self { width, height })
    }
}

impl std::fmt::Display for TargetResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Configuration for scanning and processing a wallpaper collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target width in pixels
    pub target_width: u32,

    /// Target height in pixels
    pub target_height: u32,

    /// Largest integer scale factor the external tool is asked for
    pub max_upscale_factor: u32,

    /// File extensions (lowercase, without dot) considered images
    pub supported_extensions: Vec<String>,

    /// Stem marker of files produced by a previous upscale run
    pub upscaled_marker: String,

    /// Theme used when the user leaves the theme prompt blank
    pub default_theme: String,

    /// External tool executable
    pub tool: String,

    /// Per-image timeout for the external tool, in seconds
    pub job_timeout_secs: u64,

    /// Timeout for quick tool queries such as `list`, in seconds
    pub list_timeout_secs: u64,

    /// Maximum directory depth for scanning
    pub max_depth: Option<usize>,

    /// Log external tool commands and output
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_width: 2560,
            target_height: 1440,
            max_upscale_factor: 4,
            supported_extensions: ["jpg", "jpeg", "png", "webp", "bmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            upscaled_marker: "_upscaled".to_string(),
            default_theme: "gruvbox".to_string(),
            tool: "gowall".to_string(),
            job_timeout_secs: 300,
            list_timeout_secs: 5,
            max_depth: None,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(Error::Configuration(
                "Target resolution must be positive in both dimensions".to_string(),
            ));
        }

        // The tool only accepts integer factors of 2 and up
        if self.max_upscale_factor < 2 {
            return Err(Error::Configuration(
                "Maximum upscale factor must be at least 2".to_string(),
            ));
        }

        if self.supported_extensions.is_empty() {
            return Err(Error::Configuration(
                "At least one supported extension is required".to_string(),
            ));
        }

        if self.upscaled_marker.is_empty() {
            return Err(Error::Configuration(
                "Upscaled marker must not be empty".to_string(),
            ));
        }

        if self.job_timeout_secs == 0 {
            return Err(Error::Configuration(
                "Job timeout must be greater than zero".to_string(),
            ));
        }

        if self.list_timeout_secs == 0 {
            return Err(Error::Configuration(
                "List timeout must be greater than zero".to_string(),
            ));
        }

        if self.tool.trim().is_empty() {
            return Err(Error::Configuration("Tool name must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn target(&self) -> TargetResolution {
        TargetResolution::new(self.target_width, self.target_height)
    }

    pub fn set_target(&mut self, target: TargetResolution) {
        self.target_width = target.width;
        self.target_height = target.height;
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    /// Check an extension (without dot) against the supported list, ignoring case
    pub fn is_supported_extension(&self, ext: &str) -> bool {
        self.supported_extensions
            .iter()
            .any(|supported| supported.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target(), TargetResolution::new(2560, 1440));
        assert_eq!(config.job_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_validate_rejects_small_factor() {
        let config = Config {
            max_upscale_factor: 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_zero_list_timeout() {
        let config = Config {
            list_timeout_secs: 0,
            ..Default::default()
        };
        match config.validate() {
            Err(Error::Configuration(message)) => assert!(message.contains("List timeout")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_target() {
        let config = Config {
            target_height: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_target_resolution() {
        assert_eq!(
            TargetResolution::parse("1920x1080").unwrap(),
            TargetResolution::new(1920, 1080)
        );
        assert_eq!(
            TargetResolution::parse(" 3840X2160 ").unwrap(),
            TargetResolution::new(3840, 2160)
        );
        assert!(TargetResolution::parse("1920").is_err());
        assert!(TargetResolution::parse("axb").is_err());
    }

    #[test]
    fn test_extension_matching_ignores_case() {
        let config = Config::default();
        assert!(config.is_supported_extension("JPG"));
        assert!(config.is_supported_extension("webp"));
        assert!(!config.is_supported_extension("gif"));
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallpaper-manager.json");

        let config = Config {
            target_width: 1920,
            target_height: 1080,
            default_theme: "nord".to_string(),
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.target(), TargetResolution::new(1920, 1080));
        assert_eq!(loaded.default_theme, "nord");
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "max_upscale_factor": 8 }"#).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.max_upscale_factor, 8);
        assert_eq!(loaded.tool, "gowall");
    }
}
