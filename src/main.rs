mod cli;
mod commands;
mod config;
mod doctor;
mod error;
mod gsettings;
mod logging;
mod rotator;
mod scanner;

use std::{error::Error, process::ExitCode};

use clap::Parser;
use cli::Args;
use commands::Outcome;
use config::{Mode, Settings};

fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match Settings::load(&args) {
        Ok(settings) => settings,
        Err(err) => return commands::report_failure(err.as_ref()),
    };

    // Initialize logging
    logging::init(&settings.log_file);

    let outcome: Result<Outcome, Box<dyn Error>> = match settings.mode {
        Mode::List => commands::list(&settings, &mut std::io::stdout().lock()).map_err(Into::into),
        Mode::Once => Ok(commands::once(&settings)),
        Mode::Check => commands::check(&settings),
        Mode::InitConfig => commands::init_config(&settings),
        Mode::Daemon => commands::daemon(&settings),
    };

    match outcome {
        Ok(outcome) => outcome.into(),
        Err(err) => commands::report_failure(err.as_ref()),
    }
}
