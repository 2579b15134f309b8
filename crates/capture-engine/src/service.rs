//! High-level capture service: frames to files, with delays and naming.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pipewrench_common::config::AppConfig;
use pipewrench_common::error::PipewrenchResult;
use pipewrench_platform_x11::{DisplaySession, ScreenDescriptor, WindowDescriptor};

use crate::capture::Capturer;
use crate::encoder::{self, CaptureFormat, DEFAULT_JPEG_QUALITY};
use crate::frame::RawFrame;
use crate::store::{CaptureKind, CaptureStore};

/// Options for one capture request.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub format: CaptureFormat,
    pub jpeg_quality: u8,
    /// Seconds to count down before the frame is grabbed.
    pub delay_seconds: u64,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            format: CaptureFormat::Png,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            delay_seconds: 0,
        }
    }
}

impl CaptureOptions {
    /// Options seeded from the configured defaults.
    pub fn from_config(config: &AppConfig) -> Self {
        let format = match config.capture.format.parse() {
            Ok(format) => format,
            Err(e) => {
                tracing::warn!("Configured capture format not usable: {e}");
                CaptureFormat::default()
            }
        };
        Self {
            format,
            jpeg_quality: config.capture.jpeg_quality,
            delay_seconds: config.capture.delay_seconds,
        }
    }
}

/// Ties the capturer, encoder, and store together: one call captures a
/// target and leaves a correctly named file in the captures directory.
pub struct CaptureService {
    capturer: Capturer,
    store: CaptureStore,
}

impl CaptureService {
    pub fn new(session: Arc<DisplaySession>, captures_dir: impl Into<PathBuf>) -> Self {
        Self {
            capturer: Capturer::new(session),
            store: CaptureStore::new(captures_dir),
        }
    }

    pub fn store(&self) -> &CaptureStore {
        &self.store
    }

    /// Capture a window and write it out. Returns the saved path.
    pub async fn capture_window_to_file(
        &self,
        window: &WindowDescriptor,
        options: &CaptureOptions,
    ) -> PipewrenchResult<PathBuf> {
        wait_delay(options.delay_seconds).await;
        let frame = self.capturer.capture_window(window)?;
        self.write(CaptureKind::Window, &frame, options)
    }

    /// Capture a detected screen by index and write it out.
    pub async fn capture_screen_to_file(
        &self,
        screens: &[ScreenDescriptor],
        index: i32,
        options: &CaptureOptions,
    ) -> PipewrenchResult<PathBuf> {
        wait_delay(options.delay_seconds).await;
        let frame = self.capturer.capture_screen(screens, index)?;
        self.write(CaptureKind::Screen, &frame, options)
    }

    fn write(
        &self,
        kind: CaptureKind,
        frame: &RawFrame,
        options: &CaptureOptions,
    ) -> PipewrenchResult<PathBuf> {
        self.store.ensure_dir()?;
        let path = self.store.next_path(kind, options.format);
        encoder::save(frame, &path, options.format, options.jpeg_quality)?;
        tracing::info!(
            path = %path.display(),
            width = frame.width(),
            height = frame.height(),
            "Capture saved"
        );
        Ok(path)
    }
}

/// Count down the capture delay, one log line per second.
async fn wait_delay(seconds: u64) {
    for remaining in (1..=seconds).rev() {
        tracing::info!(remaining, "Capturing soon");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

/// Resolve the captures directory: an explicit override wins, otherwise
/// the configured one.
pub fn resolve_captures_dir(config: &AppConfig, override_dir: Option<&Path>) -> PathBuf {
    match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => config.captures_dir.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_fall_back_when_configured_format_is_bad() {
        let mut config = AppConfig::default();
        config.capture.format = "tiff".to_string();
        config.capture.jpeg_quality = 75;
        config.capture.delay_seconds = 2;

        let options = CaptureOptions::from_config(&config);
        assert_eq!(options.format, CaptureFormat::Png);
        assert_eq!(options.jpeg_quality, 75);
        assert_eq!(options.delay_seconds, 2);
    }

    #[test]
    fn options_pick_up_configured_format() {
        let mut config = AppConfig::default();
        config.capture.format = "jpeg".to_string();

        let options = CaptureOptions::from_config(&config);
        assert_eq!(options.format, CaptureFormat::Jpeg);
    }

    #[test]
    fn captures_dir_override_wins() {
        let config = AppConfig::default();
        let resolved = resolve_captures_dir(&config, Some(Path::new("/tmp/elsewhere")));
        assert_eq!(resolved, PathBuf::from("/tmp/elsewhere"));

        let resolved = resolve_captures_dir(&config, None);
        assert_eq!(resolved, config.captures_dir);
    }

    #[tokio::test]
    async fn zero_delay_returns_immediately() {
        wait_delay(0).await;
    }
}
