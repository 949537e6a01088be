//! File system mutations applied after a batch: replace, delete, clean up.

use log::error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::logging::log_fs_modification;

/// Put `produced` in place of `original`
///
/// The original is first moved aside, then the produced file is renamed onto
/// the original path. If that rename fails the original is moved back, so the
/// canonical path never ends up empty because of a failed rename. The staged
/// original is removed only after the produced file is in place.
pub fn replace_original(original: &Path, produced: &Path) -> Result<()> {
    if !produced.is_file() {
        return Err(Error::MissingOutput(produced.to_path_buf()));
    }

    let staged = staging_path(original);
    fs::rename(original, &staged).map_err(|e| Error::file_op("stage", original, e))?;

    if let Err(e) = fs::rename(produced, original) {
        if let Err(restore) = fs::rename(&staged, original) {
            error!(
                "Could not restore {} from {}: {}",
                original.display(),
                staged.display(),
                restore
            );
        }
        return Err(Error::file_op("rename", produced, e));
    }

    fs::remove_file(&staged).map_err(|e| Error::file_op("remove", &staged, e))?;

    log_fs_modification(
        "replace",
        original,
        Some(&format!("with {}", produced.display())),
    );
    Ok(())
}

/// Delete one file, with the path in the error
pub fn delete_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| Error::file_op("delete", path, e))?;
    log_fs_modification("delete", path, None);
    Ok(())
}

/// Delete every file, stopping at the first failure
pub fn delete_files<'p>(paths: impl IntoIterator<Item = &'p Path>) -> Result<usize> {
    let mut deleted = 0;
    for path in paths {
        delete_file(path)?;
        deleted += 1;
    }
    Ok(deleted)
}

/// Delete the files that still exist; missing ones are skipped
pub fn delete_existing<'p>(paths: impl IntoIterator<Item = &'p Path>) -> Result<usize> {
    delete_files(paths.into_iter().filter(|p| p.exists()))
}

/// Hidden sibling used while swapping files
fn staging_path(original: &Path) -> PathBuf {
    let name = original
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    original.with_file_name(format!(".{}.replacing", name))
}
