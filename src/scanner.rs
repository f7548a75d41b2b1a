use std::path::{Path, PathBuf};

use tracing::{error, info};
use walkdir::WalkDir;

use crate::error::RotateError;

/// Extensions accepted as wallpapers, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "webp"];

/// List the supported images sitting directly inside `dir`, sorted by file name.
///
/// Sub-directories are never descended into. An empty directory yields an
/// empty list rather than an error.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, RotateError> {
    let root = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
    if !root.is_dir() {
        error!("Image directory {} not found", root.display());
        return Err(RotateError::DirectoryNotFound { path: root });
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(&root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| {
            error!("Failed to read {}: {}", root.display(), source);
            RotateError::ReadDirectory {
                path: root.clone(),
                source,
            }
        })?;

        // Symlinked images count as long as they resolve to a regular file.
        let path = entry.path();
        if path.is_file() && is_supported_image(path) {
            images.push(path.to_path_buf());
        }
    }

    info!("Found {} image file(s) in {}", images.len(), root.display());
    Ok(images)
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// File name of an image for user-facing listings.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
