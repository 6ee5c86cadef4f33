//! Input discovery.
//!
//! Walks an input directory and yields the image files to crop. The walk is
//! lazy and bounded:
//!
//! - at most `max_depth` levels below the root (1 when not recursive)
//! - at most `max_files` results
//! - symbolic links are never followed or returned, which also rules out cycles
//! - hidden files and directories (leading `.`) are skipped, and hidden
//!   directories are not descended into
//!
//! Entries are visited in file-name order within each directory, so the same
//! tree always yields the same sequence. Calling [`image_files`] again
//! restarts the walk from scratch.

use crate::config::ScanConfig;
use crate::imaging::supported_input_extensions;
use log::warn;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Input directory not found: {0}")]
    NotFound(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Whether the path has an extension with a compiled-in decoder.
pub fn is_supported_image(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    supported_input_extensions().contains(&ext.as_str())
}

/// Lazy, bounded sequence of image files under `root`.
pub fn image_files(root: &Path, config: &ScanConfig) -> impl Iterator<Item = PathBuf> + use<> {
    let max_depth = if config.recursive {
        config.max_depth.max(1)
    } else {
        1
    };

    WalkDir::new(root)
        .follow_links(false)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!("Skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_supported_image(e.path()))
        .map(DirEntry::into_path)
        .take(config.max_files)
}

/// Check `root` and collect its image files.
pub fn scan(root: &Path, config: &ScanConfig) -> Result<Vec<PathBuf>, ScanError> {
    if !root.exists() {
        return Err(ScanError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    Ok(image_files(root, config).collect())
}

/// Drop every file that lives under `dir`.
///
/// Both sides are canonicalized first, so `photos/` and `./photos/cropped`
/// compare as expected. A `dir` that does not exist yet cannot contain any
/// scanned file and excludes nothing.
pub fn exclude_dir(files: Vec<PathBuf>, dir: &Path) -> Vec<PathBuf> {
    let Ok(dir) = dir.canonicalize() else {
        return files;
    };
    files
        .into_iter()
        .filter(|p| {
            let resolved = p.canonicalize().unwrap_or_else(|_| p.clone());
            !resolved.starts_with(&dir)
        })
        .collect()
}
