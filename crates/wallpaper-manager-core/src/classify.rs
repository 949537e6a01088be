//! Resolution classification against a target.

use std::path::PathBuf;

use crate::config::TargetResolution;
use crate::error::{Error, Result};
use crate::types::{Category, ImageRecord};

/// Scale factor needed for both axes to reach the target
pub fn scale_needed(width: u32, height: u32, target: TargetResolution) -> Result<f64> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }

    let width_scale = f64::from(target.width) / f64::from(width);
    let height_scale = f64::from(target.height) / f64::from(height);

    Ok(width_scale.max(height_scale))
}

/// Compute the scale factor and category of an image
pub fn classify(
    width: u32,
    height: u32,
    target: TargetResolution,
    max_factor: u32,
) -> Result<(f64, Category)> {
    let scale = scale_needed(width, height, target)?;
    Ok((scale, Category::from_scale(scale, max_factor)))
}

/// Build a classified record for a probed file
pub fn classify_record(
    path: PathBuf,
    width: u32,
    height: u32,
    target: TargetResolution,
    max_factor: u32,
) -> Result<ImageRecord> {
    let (scale_needed, category) = classify(width, height, target, max_factor)?;

    Ok(ImageRecord {
        path,
        width,
        height,
        scale_needed,
        category,
    })
}
