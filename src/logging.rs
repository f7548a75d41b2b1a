use std::{
    fs::{self, File, OpenOptions},
    io,
    path::Path,
    sync::Mutex,
};

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the process-wide subscriber: stderr plus an append-only log file.
///
/// `RUST_LOG` overrides the default `info` level. A log file that cannot be
/// opened is reported and skipped.
pub fn init(log_file: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file, open_error) = match open_log_file(log_file) {
        Ok(file) => (Some(file), None),
        Err(err) => (None, Some(err)),
    };
    let file_layer = file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(file_layer)
        .init();

    if let Some(err) = open_error {
        warn!("Logging to stderr only, cannot open {}: {}", log_file.display(), err);
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
