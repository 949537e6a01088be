use log::{debug, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::classify::classify_record;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::log_file_error;
use crate::types::{Inventory, ScanError};

/// Reads the pixel dimensions of an image file
pub trait ImageProbe: Sync {
    fn probe(&self, path: &Path) -> Result<(u32, u32)>;
}

/// Probe backed by the `image` crate; only the header is decoded
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDimensionsProbe;

impl ImageProbe for ImageDimensionsProbe {
    fn probe(&self, path: &Path) -> Result<(u32, u32)> {
        image::image_dimensions(path).map_err(|e| Error::Probe {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl<F> ImageProbe for F
where
    F: Fn(&Path) -> Result<(u32, u32)> + Sync,
{
    fn probe(&self, path: &Path) -> Result<(u32, u32)> {
        self(path)
    }
}

/// Scan a directory tree and classify every supported image
pub fn scan(root: &Path, config: &Config, probe: &dyn ImageProbe) -> Result<Inventory> {
    if !root.is_dir() {
        return Err(Error::DirectoryNotFound(root.to_path_buf()));
    }

    info!("Scanning {}", root.display());
    let candidates = discover_candidates(root, config);
    debug!("{} candidate files under {}", candidates.len(), root.display());

    let target = config.target();
    let max_factor = config.max_upscale_factor;

    // par_iter keeps input order on collect, so traversal order survives
    let outcomes: Vec<Result<_>> = candidates
        .par_iter()
        .map(|path| {
            let (width, height) = probe.probe(path)?;
            classify_record(path.clone(), width, height, target, max_factor)
        })
        .collect();

    let mut inventory = Inventory::default();
    for (path, outcome) in candidates.into_iter().zip(outcomes) {
        match outcome {
            Ok(record) => inventory.records.push(record),
            Err(e) => {
                log_file_error(&path, "probe", &e);
                inventory.errors.push(ScanError {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    if !inventory.errors.is_empty() {
        warn!("{} files could not be read", inventory.errors.len());
    }
    info!("Found {} images", inventory.records.len());

    Ok(inventory)
}

/// Files under `root` that pass the extension and marker filters
pub fn discover_candidates(root: &Path, config: &Config) -> Vec<PathBuf> {
    let max_depth = config.max_depth.unwrap_or(usize::MAX);

    WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_supported_extension(path, config))
        .filter(|path| !is_generated_output(path, &config.upscaled_marker))
        .collect()
}

/// Returns if the given path has one of the configured image extensions
pub fn has_supported_extension(path: &Path, config: &Config) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| config.is_supported_extension(ext))
        .unwrap_or(false)
}

/// Returns if the file stem carries the marker of a previous upscale run
pub fn is_generated_output(path: &Path, marker: &str) -> bool {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().contains(marker))
        .unwrap_or(false)
}

// -- Tests --
