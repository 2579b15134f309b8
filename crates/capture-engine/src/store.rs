//! The captures directory: file naming, creation, and listing.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{Local, NaiveDateTime};
use pipewrench_common::error::{PipewrenchError, PipewrenchResult};

use crate::encoder::CaptureFormat;

/// Timestamp layout inside capture file names.
const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// What a capture file contains, as recorded in its name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    Window,
    Screen,
}

impl CaptureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureKind::Window => "window",
            CaptureKind::Screen => "screen",
        }
    }
}

/// One saved capture found in the captures directory.
#[derive(Debug, Clone)]
pub struct CaptureFile {
    pub path: PathBuf,
    /// Parsed from the file name; `None` for files this tool did not name.
    pub kind: Option<CaptureKind>,
    /// Timestamp parsed from the file name.
    pub timestamp: Option<NaiveDateTime>,
    pub modified: SystemTime,
}

impl CaptureFile {
    /// File name for display, lossily decoded.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// The directory capture files are written into.
pub struct CaptureStore {
    dir: PathBuf,
}

impl CaptureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the captures directory if it does not exist yet.
    pub fn ensure_dir(&self) -> PipewrenchResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            PipewrenchError::config(format!(
                "Cannot create captures directory {}: {e}",
                self.dir.display()
            ))
        })
    }

    /// Path for a capture taken right now, named `window_YYYYMMDD_HHMMSS`
    /// or `screen_YYYYMMDD_HHMMSS` with the format's extension.
    pub fn next_path(&self, kind: CaptureKind, format: CaptureFormat) -> PathBuf {
        let stamp = Local::now().format(FILE_STAMP_FORMAT).to_string();
        self.dir.join(file_name_for(kind, &stamp, format))
    }

    /// List saved captures, newest first by modification time.
    ///
    /// Only image files count; unreadable entries are skipped rather than
    /// failing the whole listing. A missing directory lists as empty.
    pub fn list(&self) -> PipewrenchResult<Vec<CaptureFile>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PipewrenchError::config(format!(
                    "Cannot read captures directory {}: {e}",
                    self.dir.display()
                )))
            }
        };

        let mut captures = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_capture_extension(&path) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let (kind, timestamp) = parse_file_name(&path);
            captures.push(CaptureFile {
                path,
                kind,
                timestamp,
                modified,
            });
        }

        captures.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(captures)
    }
}

fn file_name_for(kind: CaptureKind, stamp: &str, format: CaptureFormat) -> String {
    format!("{}_{}.{}", kind.as_str(), stamp, format.extension())
}

fn is_capture_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ext == "png" || ext == "jpg" || ext == "jpeg"
        })
        .unwrap_or(false)
}

/// Recover kind and timestamp from a `window_20250101_123456` style stem.
/// Foreign file names still list, just without either.
fn parse_file_name(path: &Path) -> (Option<CaptureKind>, Option<NaiveDateTime>) {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return (None, None);
    };

    let (kind, rest) = if let Some(rest) = stem.strip_prefix("window_") {
        (CaptureKind::Window, rest)
    } else if let Some(rest) = stem.strip_prefix("screen_") {
        (CaptureKind::Screen, rest)
    } else {
        return (None, None);
    };

    let timestamp = NaiveDateTime::parse_from_str(rest, FILE_STAMP_FORMAT).ok();
    (Some(kind), timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn file_names_carry_kind_stamp_and_extension() {
        assert_eq!(
            file_name_for(CaptureKind::Window, "20250101_093000", CaptureFormat::Png),
            "window_20250101_093000.png"
        );
        assert_eq!(
            file_name_for(CaptureKind::Screen, "20250101_093000", CaptureFormat::Jpeg),
            "screen_20250101_093000.jpg"
        );
    }

    #[test]
    fn file_names_parse_back() {
        let (kind, timestamp) = parse_file_name(Path::new("window_20250614_154233.png"));
        assert_eq!(kind, Some(CaptureKind::Window));
        let timestamp = timestamp.unwrap();
        assert_eq!(
            timestamp.date(),
            NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
        );
        assert_eq!(timestamp.hour(), 15);
        assert_eq!(timestamp.second(), 33);

        let (kind, timestamp) = parse_file_name(Path::new("screen_20250614_154233.jpg"));
        assert_eq!(kind, Some(CaptureKind::Screen));
        assert!(timestamp.is_some());
    }

    #[test]
    fn foreign_file_names_parse_as_unknown() {
        assert_eq!(parse_file_name(Path::new("vacation.png")), (None, None));
        let (kind, timestamp) = parse_file_name(Path::new("window_not_a_stamp.png"));
        assert_eq!(kind, Some(CaptureKind::Window));
        assert_eq!(timestamp, None);
    }

    #[test]
    fn only_image_extensions_are_listed() {
        assert!(is_capture_extension(Path::new("a.png")));
        assert!(is_capture_extension(Path::new("a.JPG")));
        assert!(is_capture_extension(Path::new("a.Jpeg")));
        assert!(!is_capture_extension(Path::new("a.txt")));
        assert!(!is_capture_extension(Path::new("png")));
    }
}
