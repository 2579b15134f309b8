//! Capture a window or screen to an image file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use pipewrench_capture_engine::service::resolve_captures_dir;
use pipewrench_capture_engine::{CaptureOptions, CaptureService};
use pipewrench_common::config::AppConfig;
use pipewrench_platform_x11::{detect_screens, list_windows, DisplaySession, WindowDescriptor};
use pipewrench_protocol::ImagePayload;

pub async fn run_window(
    id: Option<String>,
    title: Option<String>,
    format: Option<String>,
    quality: Option<u8>,
    delay: Option<u64>,
    output_dir: Option<PathBuf>,
    envelope: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = AppConfig::load();
    let session = Arc::new(
        DisplaySession::open().map_err(|e| anyhow::anyhow!("Cannot open display: {e}"))?,
    );

    let windows = list_windows(&session);
    let window = select_window(&windows, id.as_deref(), title.as_deref())?;
    let shown_title = if window.title.is_empty() {
        window.wm_class.as_deref().unwrap_or("untitled")
    } else {
        &window.title
    };
    println!("Capturing window 0x{:08x} ({})", window.id, shown_title);

    let options = build_options(&config, format, quality, delay)?;
    let service = CaptureService::new(
        session.clone(),
        resolve_captures_dir(&config, output_dir.as_deref()),
    );
    let path = service.capture_window_to_file(&window, &options).await?;
    println!("Saved: {}", path.display());

    if let Some(envelope_path) = envelope {
        write_envelope(&path, &window.title, &envelope_path)?;
        println!("Envelope: {}", envelope_path.display());
    }

    Ok(())
}

pub async fn run_screen(
    index: i32,
    format: Option<String>,
    quality: Option<u8>,
    delay: Option<u64>,
    output_dir: Option<PathBuf>,
    envelope: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = AppConfig::load();
    let session = Arc::new(
        DisplaySession::open().map_err(|e| anyhow::anyhow!("Cannot open display: {e}"))?,
    );

    let screens = detect_screens(&session);
    let screen_name = screens
        .iter()
        .find(|s| s.index == index)
        .map(|s| s.name.clone())
        .unwrap_or_default();

    let options = build_options(&config, format, quality, delay)?;
    let service = CaptureService::new(
        session.clone(),
        resolve_captures_dir(&config, output_dir.as_deref()),
    );
    let path = service
        .capture_screen_to_file(&screens, index, &options)
        .await?;
    println!("Saved: {}", path.display());

    if let Some(envelope_path) = envelope {
        write_envelope(&path, &screen_name, &envelope_path)?;
        println!("Envelope: {}", envelope_path.display());
    }

    Ok(())
}

fn select_window(
    windows: &[WindowDescriptor],
    id: Option<&str>,
    title: Option<&str>,
) -> anyhow::Result<WindowDescriptor> {
    if let Some(raw) = id {
        let id = parse_window_id(raw)?;
        return windows
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .with_context(|| format!("No capturable window with id 0x{id:08x}"));
    }
    if let Some(needle) = title {
        let lowered = needle.to_lowercase();
        return windows
            .iter()
            .find(|w| w.title.to_lowercase().contains(&lowered))
            .cloned()
            .with_context(|| format!("No window title contains '{needle}'"));
    }
    anyhow::bail!("Pass --id or --title to pick a window (see `pipewrench windows`)")
}

fn parse_window_id(raw: &str) -> anyhow::Result<u32> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.with_context(|| format!("Invalid window id '{raw}'"))
}

fn build_options(
    config: &AppConfig,
    format: Option<String>,
    quality: Option<u8>,
    delay: Option<u64>,
) -> anyhow::Result<CaptureOptions> {
    let mut options = CaptureOptions::from_config(config);
    if let Some(format) = format {
        options.format = format.parse()?;
    }
    if let Some(quality) = quality {
        anyhow::ensure!((1..=100).contains(&quality), "--quality must be 1-100");
        options.jpeg_quality = quality;
    }
    if let Some(delay) = delay {
        options.delay_seconds = delay;
    }
    Ok(options)
}

fn write_envelope(
    image_path: &Path,
    window_title: &str,
    envelope_path: &Path,
) -> anyhow::Result<()> {
    let payload = ImagePayload::from_file(image_path, window_title, "manual")?;
    let raw = serde_json::to_string_pretty(&payload)?;
    std::fs::write(envelope_path, raw)
        .with_context(|| format!("Cannot write envelope to {}", envelope_path.display()))?;
    Ok(())
}
