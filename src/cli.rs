use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::config::{Mode, validate_interval_hours};

/// CLI switches for listing, one-shot changes, diagnostics or the daemon loop.
#[derive(Parser, Debug)]
#[command(
    name = "wallrotate",
    version,
    about = "Random GNOME wallpaper rotator",
    group(ArgGroup::new("mode").args(["once", "list", "check", "init_config"]))
)]
pub struct Args {
    /// Directory with the wallpaper images (default: places).
    #[arg(short = 'd', long = "directory", value_name = "PATH")]
    pub directory: Option<PathBuf>,

    /// Hours between changes in daemon mode, fractions allowed (default: 1.0).
    #[arg(
        short = 'i',
        long = "interval",
        value_name = "HOURS",
        value_parser = parse_interval_hours
    )]
    pub interval: Option<f64>,

    /// Change the wallpaper once and exit.
    #[arg(long)]
    pub once: bool,

    /// Print the images that would be picked from and exit.
    #[arg(long)]
    pub list: bool,

    /// Check gsettings, the desktop session and the image directory.
    #[arg(long)]
    pub check: bool,

    /// Write a commented default config file and exit.
    #[arg(long = "init-config")]
    pub init_config: bool,

    /// Read settings from this file instead of ~/.config/wallrotate/config.toml.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append the event log to this file.
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn mode(&self) -> Mode {
        if self.list {
            Mode::List
        } else if self.once {
            Mode::Once
        } else if self.check {
            Mode::Check
        } else if self.init_config {
            Mode::InitConfig
        } else {
            Mode::Daemon
        }
    }
}

fn parse_interval_hours(value: &str) -> Result<f64, String> {
    let hours = value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("`{value}` is not a number of hours"))?;
    validate_interval_hours(hours)
}
