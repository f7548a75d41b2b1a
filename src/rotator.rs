use std::{
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};

use rand::{Rng, seq::SliceRandom};
use tracing::{error, info, warn};

use crate::{
    error::RotateError,
    gsettings::{BackgroundKey, BackgroundSetter, file_uri},
    scanner,
};

/// Pick the next wallpaper out of `candidates`, scanned from `directory`,
/// skipping `previous` when something else is available.
///
/// The exclusion only applies when `previous` is still among the freshly
/// scanned candidates.
pub fn select_next<'a, R: Rng + ?Sized>(
    directory: &Path,
    candidates: &'a [PathBuf],
    previous: Option<&Path>,
    rng: &mut R,
) -> Result<&'a PathBuf, RotateError> {
    let repeat = previous.filter(|prev| {
        candidates.len() > 1 && candidates.iter().any(|candidate| candidate == prev)
    });

    let pool: Vec<&PathBuf> = match repeat {
        Some(prev) => candidates
            .iter()
            .filter(|candidate| candidate.as_path() != prev)
            .collect(),
        None => candidates.iter().collect(),
    };

    pool.choose(rng)
        .copied()
        .ok_or_else(|| RotateError::NoImagesFound {
            path: directory.to_path_buf(),
        })
}

/// Scans a directory and rotates the desktop background through its images.
pub struct Rotator<S, R> {
    directory: PathBuf,
    setter: S,
    rng: R,
    current: Option<PathBuf>,
}

impl<S: BackgroundSetter, R: Rng> Rotator<S, R> {
    pub fn new(directory: impl Into<PathBuf>, setter: S, rng: R) -> Self {
        Self {
            directory: directory.into(),
            setter,
            rng,
            current: None,
        }
    }

    /// Image applied by the last successful [`Rotator::apply`].
    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    #[cfg(test)]
    pub fn setter(&self) -> &S {
        &self.setter
    }

    /// Set `image` for the light and then the dark appearance.
    ///
    /// Stops at the first rejected key; the current image only changes once
    /// both keys were accepted.
    pub fn apply(&mut self, image: &Path) -> Result<(), RotateError> {
        let uri = file_uri(image);
        for key in BackgroundKey::ALL {
            if let Err(err) = self.setter.set_background(key, &uri) {
                error!("Failed to set wallpaper to {}: {}", image.display(), err);
                return Err(err);
            }
        }

        info!("Wallpaper changed to {}", scanner::display_name(image));
        self.current = Some(image.to_path_buf());
        Ok(())
    }

    /// Scan, choose and apply one wallpaper.
    pub fn run_once(&mut self) -> Result<PathBuf, RotateError> {
        let candidates = scanner::list_images(&self.directory)?;
        let selected = select_next(
            &self.directory,
            &candidates,
            self.current.as_deref(),
            &mut self.rng,
        )
        .inspect_err(|err| error!("{}", err))?
        .clone();

        self.apply(&selected)?;
        Ok(selected)
    }

    /// Apply immediately, then once per `interval` until `shutdown` resolves.
    ///
    /// A failed tick is logged and the loop keeps going. The interval is
    /// counted from the end of the previous attempt.
    pub async fn run_daemon<F>(&mut self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting wallpaper daemon for {} (interval: {})",
            self.directory.display(),
            format_interval(interval)
        );
        tokio::pin!(shutdown);

        self.tick();
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = tokio::time::sleep(interval) => {}
            }
            info!("Interval elapsed, changing wallpaper");
            self.tick();
        }

        match self.current() {
            Some(image) => info!(
                "Wallpaper daemon stopped, leaving {} applied",
                scanner::display_name(image)
            ),
            None => info!("Wallpaper daemon stopped"),
        }
    }

    fn tick(&mut self) {
        if let Err(err) = self.run_once() {
            warn!("Wallpaper change failed, retrying next interval: {}", err);
        }
    }
}

/// Render an interval as HH:MM:SS for log lines.
pub fn format_interval(interval: Duration) -> String {
    let seconds = interval.as_secs();
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}
