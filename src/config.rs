use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use std::env;

use crate::cli::Args;

const CONFIG_HEADER: &str = "\
# ///////////////////////////////////////////////
# This config drives wallrotate. Every key is
# optional and command line flags win over the
# values here. directory is the folder scanned
# (non-recursively) for jpg, jpeg, png, bmp,
# tiff and webp files. interval_hours is the
# time between wallpaper changes in daemon mode
# and may be fractional (0.5 = 30 minutes).
# log_file is where the append-only event log
# is written.
# ///////////////////////////////////////////////
";

pub const APP_NAME: &str = "wallrotate";
pub const DEFAULT_DIRECTORY: &str = "places";
pub const DEFAULT_INTERVAL_HOURS: f64 = 1.0;

/// Lookup used for `$VAR` expansion and XDG directories.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// What the process was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print the candidate images and exit.
    List,
    /// Change the wallpaper a single time.
    Once,
    /// Run the environment diagnostics.
    Check,
    /// Write a default config file.
    InitConfig,
    /// Keep rotating until interrupted.
    Daemon,
}

/// Settings resolved from CLI flags, the config file and built-in defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,
    pub directory: PathBuf,
    pub interval: Duration,
    pub log_file: PathBuf,
    /// `None` when neither `--config`, XDG_CONFIG_HOME nor HOME point anywhere.
    pub config_path: Option<PathBuf>,
}

/// On-disk layout of config.toml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    fn starter() -> Self {
        Self {
            directory: Some(PathBuf::from(DEFAULT_DIRECTORY)),
            interval_hours: Some(DEFAULT_INTERVAL_HOURS),
            log_file: None,
        }
    }
}

impl Settings {
    /// Resolve settings for this process from `args`, the environment and disk.
    pub fn load(args: &Args) -> Result<Self, Box<dyn Error>> {
        let lookup = |name: &str| env::var(name).ok();
        Self::load_with(args, &lookup)
    }

    /// Same as [`Settings::load`] with an explicit environment.
    ///
    /// Without `--config` the file is optional: a missing file, or no
    /// resolvable config directory at all, falls back to the defaults.
    pub fn load_with(args: &Args, lookup: EnvLookup<'_>) -> Result<Self, Box<dyn Error>> {
        let config_path = match &args.config {
            Some(path) => {
                let path = normalize_path(path, lookup);
                if !path.exists() {
                    return Err(format!("Config file {} does not exist", path.display()).into());
                }
                Some(path)
            }
            None => default_config_path(lookup).ok(),
        };

        let file = match &config_path {
            Some(path) => read_file_config(path)?.unwrap_or_default(),
            None => FileConfig::default(),
        };

        Self::from_sources(args, file, config_path, lookup)
    }

    /// Merge flags over file values over defaults.
    pub fn from_sources(
        args: &Args,
        file: FileConfig,
        config_path: Option<PathBuf>,
        lookup: EnvLookup<'_>,
    ) -> Result<Self, Box<dyn Error>> {
        let directory = args
            .directory
            .clone()
            .or(file.directory)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIRECTORY));

        let hours = match (args.interval, file.interval_hours) {
            (Some(hours), _) => hours,
            (None, Some(hours)) => {
                validate_interval_hours(hours).map_err(|err| {
                    let source = config_path
                        .as_deref()
                        .map(|path| path.display().to_string())
                        .unwrap_or_else(|| "config file".into());
                    format!("Invalid interval_hours in {source}: {err}")
                })?;
                hours
            }
            (None, None) => DEFAULT_INTERVAL_HOURS,
        };

        let log_file = match args.log_file.clone().or(file.log_file) {
            Some(path) => normalize_path(&path, lookup),
            None => default_log_path(lookup),
        };

        Ok(Settings {
            mode: args.mode(),
            directory: normalize_path(&directory, lookup),
            interval: Duration::from_secs_f64(hours * 3600.0),
            log_file,
            config_path,
        })
    }
}

/// Shortest accepted interval between wallpaper changes.
pub const MIN_INTERVAL_SECS: f64 = 1.0;

/// Reject intervals that cannot drive a sleep (NaN, infinite, under a second).
pub fn validate_interval_hours(hours: f64) -> Result<f64, String> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(format!("interval must be a positive number of hours, got {hours}"));
    }
    if hours * 3600.0 < MIN_INTERVAL_SECS {
        return Err(format!(
            "interval of {hours} hours is shorter than {MIN_INTERVAL_SECS} second"
        ));
    }
    // Duration::from_secs_f64 panics past u64::MAX seconds.
    if hours * 3600.0 >= u64::MAX as f64 {
        return Err(format!("interval of {hours} hours is too large"));
    }
    Ok(hours)
}

/// Resolve $XDG_CONFIG_HOME/wallrotate/config.toml (or ~/.config/...).
pub fn default_config_path(lookup: EnvLookup<'_>) -> Result<PathBuf, Box<dyn Error>> {
    let base = match lookup("XDG_CONFIG_HOME").filter(|value| !value.is_empty()) {
        Some(custom) => PathBuf::from(custom),
        None => {
            let home = lookup("HOME").ok_or("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        }
    };
    Ok(base.join(APP_NAME).join("config.toml"))
}

/// $XDG_STATE_HOME/wallrotate/wallrotate.log, falling back to the working directory.
pub fn default_log_path(lookup: EnvLookup<'_>) -> PathBuf {
    let file_name = format!("{APP_NAME}.log");
    let base = lookup("XDG_STATE_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| lookup("HOME").map(|home| PathBuf::from(home).join(".local/state")));

    match base {
        Some(base) => base.join(APP_NAME).join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Parse config.toml, returning `None` when it does not exist.
pub fn read_file_config(path: &Path) -> Result<Option<FileConfig>, Box<dyn Error>> {
    if !path.exists() {
        return Ok(None);
    }

    let data = fs::read_to_string(path)
        .map_err(|err| format!("Unable to read {}: {}", path.display(), err))?;
    let file: FileConfig = toml::from_str(&data)
        .map_err(|err| format!("Invalid config {}: {}", path.display(), err))?;
    Ok(Some(file))
}

/// Write a commented starter config unless one is already there.
///
/// Returns `false` when an existing file was left untouched.
pub fn write_default_config(path: &Path) -> Result<bool, Box<dyn Error>> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let data = toml::to_string_pretty(&FileConfig::starter())?;
    let mut content = String::from(CONFIG_HEADER);
    content.push_str(&data);
    fs::write(path, content)?;
    Ok(true)
}

/// Expand a leading `~` or `$VAR` and anchor relative paths at the working directory.
pub fn normalize_path(path: &Path, lookup: EnvLookup<'_>) -> PathBuf {
    let expanded = match path.to_str() {
        Some(raw) => PathBuf::from(expand_leading_tokens(raw, lookup)),
        None => path.to_path_buf(),
    };

    if expanded.is_absolute() {
        return expanded;
    }
    std::path::absolute(&expanded).unwrap_or(expanded)
}

fn expand_leading_tokens(value: &str, lookup: EnvLookup<'_>) -> String {
    let value = expand_home_prefix(value, lookup).unwrap_or_else(|| value.to_string());
    expand_env_prefix(&value, lookup).unwrap_or(value)
}

fn expand_home_prefix(value: &str, lookup: EnvLookup<'_>) -> Option<String> {
    let rest = match value.strip_prefix('~') {
        Some("") => "",
        Some(rest) => rest.strip_prefix('/')?,
        None => return None,
    };

    let home = lookup("HOME")?;
    if rest.is_empty() {
        return Some(home);
    }
    Some(Path::new(&home).join(rest).to_string_lossy().into_owned())
}

fn expand_env_prefix(value: &str, lookup: EnvLookup<'_>) -> Option<String> {
    let rest = value.strip_prefix('$')?;

    let (name, remainder) = if let Some(braced) = rest.strip_prefix('{') {
        let end = braced.find('}')?;
        (&braced[..end], &braced[end + 1..])
    } else {
        let len = rest
            .find(|ch: char| ch != '_' && !ch.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        rest.split_at(len)
    };

    if name.is_empty() {
        return None;
    }
    let val = lookup(name)?;
    Some(format!("{val}{remainder}"))
}
