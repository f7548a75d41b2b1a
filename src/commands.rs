use std::{
    error::Error,
    future::Future,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{error, info};

use crate::{
    config::{self, Settings},
    doctor,
    error::RotateError,
    gsettings::{BackgroundSetter, GSettings},
    rotator::Rotator,
    scanner,
};

/// How a mode finished, turned into the process exit code by `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failure => ExitCode::FAILURE,
        }
    }
}

/// `--list`: print the candidate images without touching the desktop.
pub fn list(settings: &Settings, out: &mut dyn Write) -> io::Result<Outcome> {
    match scanner::list_images(&settings.directory) {
        Ok(images) => {
            write!(out, "{}", format_listing(&images))?;
            if images.is_empty() {
                eprintln!(
                    "{}",
                    RotateError::NoImagesFound {
                        path: settings.directory.clone(),
                    }
                );
                return Ok(Outcome::Failure);
            }
            Ok(Outcome::Success)
        }
        Err(err) => {
            eprintln!("Unable to list images: {err}");
            Ok(Outcome::Failure)
        }
    }
}

pub fn format_listing(images: &[PathBuf]) -> String {
    let mut out = format!("Found {} image file(s):\n", images.len());
    for image in images {
        out.push_str("  - ");
        out.push_str(&scanner::display_name(image));
        out.push('\n');
    }
    out
}

/// `--once`: change the wallpaper a single time.
pub fn once(settings: &Settings) -> Outcome {
    once_with(&mut production_rotator(settings))
}

pub fn once_with<S: BackgroundSetter, R: Rng>(rotator: &mut Rotator<S, R>) -> Outcome {
    println!("Changing wallpaper...");
    match rotator.run_once() {
        Ok(image) => {
            println!("Wallpaper changed to {}", scanner::display_name(&image));
            Outcome::Success
        }
        Err(err @ RotateError::ToolUnavailable { .. }) => {
            eprintln!("Cannot change wallpaper, {err}. Is this a GNOME session?");
            Outcome::Failure
        }
        Err(err) => {
            eprintln!("Failed to change wallpaper: {err}");
            Outcome::Failure
        }
    }
}

/// Default mode: rotate on `settings.interval` until SIGINT or SIGTERM.
pub fn daemon(settings: &Settings) -> Result<Outcome, Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let outcome = runtime.block_on(async {
        // Listeners go in before the first apply so an early signal is not lost.
        let shutdown = shutdown_signal()?;
        let mut rotator = production_rotator(settings);
        Ok::<_, io::Error>(serve(&mut rotator, settings.interval, shutdown).await)
    })?;

    Ok(outcome)
}

/// Run the daemon loop until `shutdown` resolves. Stopping is always a success.
pub async fn serve<S, R, F>(
    rotator: &mut Rotator<S, R>,
    interval: Duration,
    shutdown: F,
) -> Outcome
where
    S: BackgroundSetter,
    R: Rng,
    F: Future<Output = ()>,
{
    rotator.run_daemon(interval, shutdown).await;
    Outcome::Success
}

/// `--check`: environment diagnostics.
pub fn check(settings: &Settings) -> Result<Outcome, Box<dyn Error>> {
    let passed = doctor::run(&settings.directory, &mut io::stdout().lock())?;
    Ok(if passed {
        Outcome::Success
    } else {
        Outcome::Failure
    })
}

/// `--init-config`: write the starter config file.
pub fn init_config(settings: &Settings) -> Result<Outcome, Box<dyn Error>> {
    let path = settings
        .config_path
        .as_deref()
        .ok_or("No config location: set HOME or XDG_CONFIG_HOME, or pass --config")?;
    if config::write_default_config(path)? {
        info!("Created default config at {}", path.display());
        println!("Created default config at {}.", path.display());
    } else {
        println!("Config already exists at {}, leaving it untouched.", path.display());
    }
    Ok(Outcome::Success)
}

fn production_rotator(settings: &Settings) -> Rotator<GSettings, StdRng> {
    Rotator::new(settings.directory.clone(), GSettings, StdRng::from_entropy())
}

#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Interrupted, shutting down"),
            _ = terminate.recv() => info!("Terminated, shutting down"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
        info!("Interrupted, shutting down");
    })
}

/// Print a fatal error and turn it into a failing exit code.
pub fn report_failure(err: &dyn Error) -> ExitCode {
    error!("{}", err);
    eprintln!("wallrotate: {err}");
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::Cell, fs, path::Path};

    use rand::rngs::mock::StepRng;

    use crate::gsettings::BackgroundKey;

    #[derive(Default)]
    struct CountingSetter {
        calls: Cell<usize>,
        unavailable: bool,
    }

    impl BackgroundSetter for CountingSetter {
        fn set_background(&self, _key: BackgroundKey, _uri: &str) -> Result<(), RotateError> {
            if self.unavailable {
                return Err(RotateError::ToolUnavailable {
                    tool: "gsettings",
                    source: io::ErrorKind::NotFound.into(),
                });
            }
            self.calls.set(self.calls.get() + 1);
            Ok(())
        }

        fn background(&self, _key: BackgroundKey) -> Result<String, RotateError> {
            Ok(String::new())
        }
    }

    fn settings_for(directory: &Path) -> Settings {
        Settings {
            mode: config::Mode::List,
            directory: directory.to_path_buf(),
            interval: Duration::from_secs(60),
            log_file: directory.join("wallrotate.log"),
            config_path: None,
        }
    }

    fn places_fixture(root: &Path) -> PathBuf {
        let places = root.join("places");
        fs::create_dir(&places).unwrap();
        for name in ["a.png", "b.jpg", "notes.txt"] {
            fs::write(places.join(name), b"").unwrap();
        }
        places
    }

    fn rotator_for(directory: &Path, setter: CountingSetter) -> Rotator<CountingSetter, StepRng> {
        Rotator::new(directory, setter, StepRng::new(0, 0))
    }

    #[test]
    fn exit_codes_follow_outcome() {
        assert_eq!(
            format!("{:?}", ExitCode::from(Outcome::Success)),
            format!("{:?}", ExitCode::SUCCESS)
        );
        assert_eq!(
            format!("{:?}", ExitCode::from(Outcome::Failure)),
            format!("{:?}", ExitCode::FAILURE)
        );
    }

    #[test]
    fn listing_shows_only_images() {
        let root = tempfile::tempdir().unwrap();
        let places = places_fixture(root.path());

        let images = scanner::list_images(&places).unwrap();
        let listing = format_listing(&images);

        assert_eq!(listing, "Found 2 image file(s):\n  - a.png\n  - b.jpg\n");
        assert!(!listing.contains("notes.txt"));
    }

    #[test]
    fn empty_listing_has_header_only() {
        assert_eq!(format_listing(&[]), "Found 0 image file(s):\n");
    }

    #[test]
    fn list_succeeds_on_places_fixture() {
        let root = tempfile::tempdir().unwrap();
        let places = places_fixture(root.path());
        let mut out = Vec::new();

        let outcome = list(&settings_for(&places), &mut out).unwrap();

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Found 2 image file(s):\n  - a.png\n  - b.jpg\n"
        );
    }

    #[test]
    fn list_fails_on_empty_directory() {
        let root = tempfile::tempdir().unwrap();
        let mut out = Vec::new();

        let outcome = list(&settings_for(root.path()), &mut out).unwrap();

        assert_eq!(outcome, Outcome::Failure);
        assert_eq!(String::from_utf8(out).unwrap(), "Found 0 image file(s):\n");
    }

    #[test]
    fn list_fails_on_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let mut out = Vec::new();

        let outcome = list(&settings_for(&root.path().join("gone")), &mut out).unwrap();

        assert_eq!(outcome, Outcome::Failure);
        assert!(out.is_empty());
    }

    #[test]
    fn once_succeeds_and_sets_both_keys() {
        let root = tempfile::tempdir().unwrap();
        let places = places_fixture(root.path());
        let mut rotator = rotator_for(&places, CountingSetter::default());

        assert_eq!(once_with(&mut rotator), Outcome::Success);
        assert_eq!(rotator.setter().calls.get(), 2);
        assert_eq!(rotator.current(), Some(places.join("a.png").as_path()));
    }

    #[test]
    fn once_fails_without_images() {
        let root = tempfile::tempdir().unwrap();
        let mut rotator = rotator_for(root.path(), CountingSetter::default());

        assert_eq!(once_with(&mut rotator), Outcome::Failure);
        assert_eq!(rotator.setter().calls.get(), 0);
    }

    #[test]
    fn once_fails_when_tool_is_unavailable() {
        let root = tempfile::tempdir().unwrap();
        let places = places_fixture(root.path());
        let setter = CountingSetter {
            unavailable: true,
            ..CountingSetter::default()
        };
        let mut rotator = rotator_for(&places, setter);

        assert_eq!(once_with(&mut rotator), Outcome::Failure);
        assert_eq!(rotator.current(), None);
    }

    #[tokio::test]
    async fn serve_succeeds_after_shutdown() {
        let root = tempfile::tempdir().unwrap();
        let places = places_fixture(root.path());
        let mut rotator = rotator_for(&places, CountingSetter::default());

        let outcome = serve(&mut rotator, Duration::from_secs(3600), async {}).await;

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(rotator.setter().calls.get(), 2);
    }

    #[tokio::test]
    async fn serve_succeeds_even_when_every_tick_fails() {
        let root = tempfile::tempdir().unwrap();
        let mut rotator = rotator_for(&root.path().join("gone"), CountingSetter::default());

        let outcome = serve(&mut rotator, Duration::from_secs(3600), async {}).await;

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(rotator.setter().calls.get(), 0);
    }

    #[test]
    fn init_config_leaves_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "interval_hours = 2.0\n").unwrap();

        let settings = Settings {
            mode: config::Mode::InitConfig,
            config_path: Some(path.clone()),
            ..settings_for(dir.path())
        };

        assert_eq!(init_config(&settings).unwrap(), Outcome::Success);
        assert_eq!(fs::read_to_string(&path).unwrap(), "interval_hours = 2.0\n");
    }

    #[test]
    fn init_config_needs_a_location() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            mode: config::Mode::InitConfig,
            ..settings_for(dir.path())
        };

        assert!(init_config(&settings).is_err());
    }
}
