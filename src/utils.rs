// ABOUTME: Utility functions for the bildumilo application
// ABOUTME: Provides path resolution, directory preparation and file copying helpers

use crate::errors::{BildumiloError, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Ensure a directory exists, creating it if necessary
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    } else if !path.is_dir() {
        return Err(BildumiloError::ValidationError(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    }
    Ok(())
}

/// Ensure a file's parent directory exists
pub fn ensure_parent_directory_exists(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory_exists(parent)?;
        }
    }
    Ok(())
}

/// Validate write permissions for a directory
pub fn validate_directory_writable(path: &Path) -> Result<()> {
    ensure_directory_exists(path)?;

    let probe = path.join(format!(".write_probe_{}.tmp", uuid::Uuid::new_v4()));
    match fs::File::create(&probe) {
        Ok(_) => {
            if let Err(e) = fs::remove_file(&probe) {
                warn!("Failed to clean up probe file {:?}: {}", probe, e);
            }
            Ok(())
        }
        Err(e) => Err(BildumiloError::ValidationError(format!(
            "Directory is not writable: {:?} - {}",
            path, e
        ))),
    }
}

/// Make a path absolute without requiring it to exist.
///
/// Existing paths are canonicalized so that watcher events, which are
/// reported under the canonical directory, compare equal.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = fs::canonicalize(path) {
        return Ok(canonical);
    }
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// File name without its final extension, as a string
pub fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| BildumiloError::ValidationError(format!("Path has no file name: {:?}", path)))
}

/// Copy `source` to `dest`, skipping the copy when both name the same file
pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let (Ok(a), Ok(b)) = (fs::canonicalize(source), fs::canonicalize(dest)) {
        if a == b {
            debug!("Skipping copy of {:?} onto itself", source);
            return Ok(());
        }
    }
    ensure_parent_directory_exists(dest)?;
    fs::copy(source, dest)?;
    Ok(())
}
