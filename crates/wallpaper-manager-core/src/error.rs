use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the wallpaper-manager library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File operation error with the path it happened on
    #[error("Failed to {operation} {}: {source}", path.display())]
    FileOperation {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scan root does not exist
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// Image reported a zero width or height
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Image could not be decoded
    #[error("Failed to read image {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    /// External tool missing or not working
    #[error("External tool unavailable: {0}")]
    ToolUnavailable(String),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Generated file expected on disk is gone
    #[error("Generated file is missing: {0}")]
    MissingOutput(PathBuf),

    /// Operation cancelled by the user
    #[error("Operation interrupted")]
    Interrupted,
}

impl Error {
    pub(crate) fn file_op(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileOperation {
            operation,
            path: path.into(),
            source,
        }
    }
}
