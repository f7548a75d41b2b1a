use std::{
    env,
    io::{self, Write},
    path::Path,
};

use crate::{
    config::EnvLookup,
    gsettings::{BackgroundKey, BackgroundSetter, GSettings},
    scanner,
};

const SAMPLE_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Info,
    Pass,
    Warn,
    Fail,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Info => "INFO",
            Status::Pass => "PASS",
            Status::Warn => "WARN",
            Status::Fail => "FAIL",
        }
    }
}

fn report(out: &mut dyn Write, status: Status, message: &str) -> io::Result<()> {
    writeln!(out, "[{}] {}", status.label(), message)
}

/// Run every environment check against `directory`, printing a summary.
///
/// Returns whether all checks passed.
pub fn run(directory: &Path, out: &mut dyn Write) -> io::Result<bool> {
    let gsettings = GSettings;
    let lookup = |name: &str| env::var(name).ok();

    let results = vec![
        ("gsettings availability", check_gsettings(&gsettings, out)?),
        ("Desktop environment", check_desktop(&lookup, out)?),
        ("Image directory", check_image_directory(directory, out)?),
        ("Current wallpaper access", check_current_wallpaper(&gsettings, out)?),
    ];

    write_summary(&results, out)
}

fn write_summary(results: &[(&str, bool)], out: &mut dyn Write) -> io::Result<bool> {
    writeln!(out)?;
    let passed = results.iter().filter(|(_, ok)| *ok).count();
    for (name, ok) in results {
        let status = if *ok { Status::Pass } else { Status::Fail };
        report(out, status, name)?;
    }

    let all_passed = passed == results.len();
    let status = if all_passed { Status::Pass } else { Status::Warn };
    report(out, status, &format!("{passed}/{} checks passed", results.len()))?;
    Ok(all_passed)
}

fn check_gsettings(gsettings: &GSettings, out: &mut dyn Write) -> io::Result<bool> {
    match gsettings.version() {
        Ok(version) => {
            report(out, Status::Pass, &format!("gsettings {version} is available"))?;
            Ok(true)
        }
        Err(err) => {
            report(out, Status::Fail, &format!("{err} (GNOME is required)"))?;
            Ok(false)
        }
    }
}

/// Non-GNOME sessions only warn; gsettings may still work there.
fn check_desktop(lookup: EnvLookup<'_>, out: &mut dyn Write) -> io::Result<bool> {
    let desktop = lookup("XDG_CURRENT_DESKTOP").unwrap_or_default();
    let session = lookup("DESKTOP_SESSION").unwrap_or_default();
    let is_gnome = [&desktop, &session]
        .iter()
        .any(|value| value.to_ascii_lowercase().contains("gnome"));

    if is_gnome {
        report(out, Status::Pass, &format!("Desktop: {desktop}"))?;
    } else {
        let shown = if desktop.is_empty() {
            "unknown"
        } else {
            desktop.as_str()
        };
        report(
            out,
            Status::Warn,
            &format!("Desktop: {shown}, GNOME is recommended"),
        )?;
    }
    Ok(true)
}

fn check_image_directory(directory: &Path, out: &mut dyn Write) -> io::Result<bool> {
    let images = match scanner::list_images(directory) {
        Ok(images) => images,
        Err(err) => {
            report(out, Status::Fail, &err.to_string())?;
            return Ok(false);
        }
    };

    if images.is_empty() {
        report(
            out,
            Status::Fail,
            &format!("No image files found in {}", directory.display()),
        )?;
        return Ok(false);
    }

    report(
        out,
        Status::Pass,
        &format!("Found {} image file(s) in {}", images.len(), directory.display()),
    )?;
    for image in images.iter().take(SAMPLE_COUNT) {
        writeln!(out, "  - {}", scanner::display_name(image))?;
    }
    if images.len() > SAMPLE_COUNT {
        writeln!(out, "  ... and {} more", images.len() - SAMPLE_COUNT)?;
    }
    Ok(true)
}

fn check_current_wallpaper<S: BackgroundSetter>(
    setter: &S,
    out: &mut dyn Write,
) -> io::Result<bool> {
    report(out, Status::Info, "Reading the current wallpaper setting")?;
    match setter.background(BackgroundKey::Light) {
        Ok(uri) => {
            report(out, Status::Pass, &format!("Current wallpaper: {uri}"))?;
            Ok(true)
        }
        Err(err) => {
            report(out, Status::Fail, &format!("Unable to read wallpaper: {err}"))?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RotateError;
    use std::fs;

    struct FixedSetter(Option<&'static str>);

    impl BackgroundSetter for FixedSetter {
        fn set_background(&self, _key: BackgroundKey, _uri: &str) -> Result<(), RotateError> {
            Ok(())
        }

        fn background(&self, key: BackgroundKey) -> Result<String, RotateError> {
            self.0.map(str::to_string).ok_or(RotateError::ApplyFailed {
                key,
                detail: "No such schema".into(),
            })
        }
    }

    fn text(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn image_directory_lists_five_samples() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..7 {
            fs::write(dir.path().join(format!("{i}.png")), b"").unwrap();
        }

        let mut out = Vec::new();
        assert!(check_image_directory(dir.path(), &mut out).unwrap());

        let text = text(out);
        assert!(text.contains("Found 7 image file(s)"));
        assert!(text.contains("  - 4.png"));
        assert!(!text.contains("  - 5.png"));
        assert!(text.contains("... and 2 more"));
    }

    #[test]
    fn image_directory_fails_when_missing_or_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        assert!(!check_image_directory(dir.path(), &mut out).unwrap());
        assert!(!check_image_directory(&dir.path().join("places"), &mut out).unwrap());
        assert!(text(out).contains("[FAIL]"));
    }

    #[test]
    fn desktop_check_only_warns() {
        let gnome =
            |name: &str| (name == "XDG_CURRENT_DESKTOP").then(|| "ubuntu:GNOME".to_string());
        let mut out = Vec::new();
        assert!(check_desktop(&gnome, &mut out).unwrap());
        assert!(text(out).starts_with("[PASS] Desktop: ubuntu:GNOME"));

        let mut out = Vec::new();
        assert!(check_desktop(&|_: &str| None, &mut out).unwrap());
        assert!(text(out).contains("[WARN] Desktop: unknown"));
    }

    #[test]
    fn current_wallpaper_is_reported() {
        let mut out = Vec::new();
        assert!(check_current_wallpaper(&FixedSetter(Some("file:///a.png")), &mut out).unwrap());
        assert!(text(out).contains("Current wallpaper: file:///a.png"));

        let mut out = Vec::new();
        assert!(!check_current_wallpaper(&FixedSetter(None), &mut out).unwrap());
    }

    #[test]
    fn summary_counts_passes() {
        let mut out = Vec::new();
        assert!(!write_summary(&[("a", true), ("b", false)], &mut out).unwrap());
        assert!(text(out).contains("1/2 checks passed"));

        let mut out = Vec::new();
        assert!(write_summary(&[("a", true)], &mut out).unwrap());
    }
}
