use std::{
    fmt, io,
    path::Path,
    process::{Command, Output, Stdio},
};

use tracing::debug;

use crate::error::RotateError;

const GSETTINGS: &str = "gsettings";
const BACKGROUND_SCHEMA: &str = "org.gnome.desktop.background";

/// The two background slots GNOME keeps, one per appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundKey {
    Light,
    Dark,
}

impl BackgroundKey {
    pub const ALL: [BackgroundKey; 2] = [BackgroundKey::Light, BackgroundKey::Dark];

    pub fn setting_name(self) -> &'static str {
        match self {
            BackgroundKey::Light => "picture-uri",
            BackgroundKey::Dark => "picture-uri-dark",
        }
    }
}

impl fmt::Display for BackgroundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.setting_name())
    }
}

/// Desktop mechanism able to read and write the background image settings.
pub trait BackgroundSetter {
    fn set_background(&self, key: BackgroundKey, uri: &str) -> Result<(), RotateError>;

    fn background(&self, key: BackgroundKey) -> Result<String, RotateError>;
}

/// GNOME expects the background as a file:// URI.
pub fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Talks to dconf through the `gsettings` command line tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct GSettings;

impl GSettings {
    /// Version string reported by the tool, used to confirm it is installed.
    pub fn version(&self) -> Result<String, RotateError> {
        let output = run(Command::new(GSETTINGS).arg("--version"))?;
        if !output.status.success() {
            return Err(RotateError::ToolUnavailable {
                tool: GSETTINGS,
                source: io::Error::other(exit_detail(&output)),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl BackgroundSetter for GSettings {
    fn set_background(&self, key: BackgroundKey, uri: &str) -> Result<(), RotateError> {
        debug!("gsettings set {} {} {}", BACKGROUND_SCHEMA, key, uri);
        let output = run(Command::new(GSETTINGS)
            .arg("set")
            .arg(BACKGROUND_SCHEMA)
            .arg(key.setting_name())
            .arg(uri))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(rejected(key, &output))
        }
    }

    fn background(&self, key: BackgroundKey) -> Result<String, RotateError> {
        let output = run(Command::new(GSETTINGS)
            .arg("get")
            .arg(BACKGROUND_SCHEMA)
            .arg(key.setting_name()))?;

        if !output.status.success() {
            return Err(rejected(key, &output));
        }
        let raw = String::from_utf8_lossy(&output.stdout);
        Ok(strip_gvariant_quotes(&raw).to_string())
    }
}

/// Any failure to start the process, not just a missing binary, is `ToolUnavailable`.
fn run(command: &mut Command) -> Result<Output, RotateError> {
    command
        .stdin(Stdio::null())
        .output()
        .map_err(|source| RotateError::ToolUnavailable {
            tool: GSETTINGS,
            source,
        })
}

fn rejected(key: BackgroundKey, output: &Output) -> RotateError {
    RotateError::ApplyFailed {
        key,
        detail: exit_detail(output),
    }
}

fn exit_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let status = output
        .status
        .code()
        .map(|code| code.to_string())
        .unwrap_or_else(|| "signal".into());
    if stderr.is_empty() {
        format!("{GSETTINGS} exited with status {status}")
    } else {
        format!("{GSETTINGS} exited with status {status}: {stderr}")
    }
}

/// `gsettings get` prints GVariant text, e.g. `'file:///a.png'`.
fn strip_gvariant_quotes(raw: &str) -> &str {
    raw.trim().trim_matches(|c| c == '\'' || c == '"')
}
