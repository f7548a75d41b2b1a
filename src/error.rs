use std::{io, path::PathBuf};

use thiserror::Error;

use crate::gsettings::BackgroundKey;

/// Everything that can go wrong while picking or applying a wallpaper.
#[derive(Debug, Error)]
pub enum RotateError {
    #[error("image directory {} not found", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("unable to read image directory {}: {source}", path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("no supported image files in {}", path.display())]
    NoImagesFound { path: PathBuf },

    #[error("{tool} could not be started: {source}")]
    ToolUnavailable {
        tool: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("setting {key} was rejected: {detail}")]
    ApplyFailed { key: BackgroundKey, detail: String },
}
