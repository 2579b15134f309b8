//! Encoding raw frames into PNG or JPEG files.

use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbaImage};
use pipewrench_common::error::{PipewrenchError, PipewrenchResult};

use crate::frame::RawFrame;

/// JPEG quality used when the caller does not pick one.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Output file format for saved captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureFormat {
    #[default]
    Png,
    Jpeg,
}

impl CaptureFormat {
    /// File extension used for this format, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            CaptureFormat::Png => "png",
            CaptureFormat::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for CaptureFormat {
    type Err = PipewrenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(CaptureFormat::Png),
            "jpg" | "jpeg" => Ok(CaptureFormat::Jpeg),
            other => Err(PipewrenchError::encode(format!(
                "Unknown image format '{other}' (expected png or jpeg)"
            ))),
        }
    }
}

/// Write a frame to `path` in the given format, creating the parent
/// directory if needed.
pub fn save(
    frame: &RawFrame,
    path: &Path,
    format: CaptureFormat,
    jpeg_quality: u8,
) -> PipewrenchResult<()> {
    match format {
        CaptureFormat::Png => save_png(frame, path),
        CaptureFormat::Jpeg => save_jpeg(frame, path, jpeg_quality),
    }
}

/// Write a frame to `path` as PNG.
pub fn save_png(frame: &RawFrame, path: &Path) -> PipewrenchResult<()> {
    let rgba = to_rgba(frame)?;
    ensure_parent_dir(path)?;
    rgba.save(path)
        .map_err(|e| PipewrenchError::encode(format!("Failed to write PNG: {e}")))?;
    Ok(())
}

/// Write a frame to `path` as JPEG at the given quality (1-100).
pub fn save_jpeg(frame: &RawFrame, path: &Path, quality: u8) -> PipewrenchResult<()> {
    let rgb = to_rgb_bytes(frame)?;
    ensure_parent_dir(path)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
    encoder
        .encode(&rgb, frame.width(), frame.height(), ExtendedColorType::Rgb8)
        .map_err(|e| PipewrenchError::encode(format!("Failed to write JPEG: {e}")))?;
    Ok(())
}

fn require_bgrx(frame: &RawFrame) -> PipewrenchResult<()> {
    if !frame.is_bgrx() {
        return Err(PipewrenchError::unsupported(format!(
            "Cannot encode frames at depth {} (expected 24 or 32)",
            frame.depth()
        )));
    }
    Ok(())
}

fn to_rgba(frame: &RawFrame) -> PipewrenchResult<RgbaImage> {
    require_bgrx(frame)?;

    let data = frame.data();
    let mut rgba = Vec::with_capacity((frame.width() * frame.height() * 4) as usize);
    for y in 0..frame.height() {
        let row = y as usize * frame.stride();
        for x in 0..frame.width() {
            let px = row + x as usize * 4;
            rgba.push(data[px + 2]); // R
            rgba.push(data[px + 1]); // G
            rgba.push(data[px]); // B
            rgba.push(0xFF); // A; the server's fourth byte is padding
        }
    }

    RgbaImage::from_raw(frame.width(), frame.height(), rgba)
        .ok_or_else(|| PipewrenchError::encode("Converted pixel buffer has the wrong size"))
}

fn to_rgb_bytes(frame: &RawFrame) -> PipewrenchResult<Vec<u8>> {
    require_bgrx(frame)?;

    let data = frame.data();
    let mut rgb = Vec::with_capacity((frame.width() * frame.height() * 3) as usize);
    for y in 0..frame.height() {
        let row = y as usize * frame.stride();
        for x in 0..frame.width() {
            let px = row + x as usize * 4;
            rgb.push(data[px + 2]); // R
            rgb.push(data[px + 1]); // G
            rgb.push(data[px]); // B
        }
    }
    Ok(rgb)
}

fn ensure_parent_dir(path: &Path) -> PipewrenchResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::solid_frame;

    #[test]
    fn format_parses_common_spellings() {
        assert_eq!("png".parse::<CaptureFormat>().unwrap(), CaptureFormat::Png);
        assert_eq!("PNG".parse::<CaptureFormat>().unwrap(), CaptureFormat::Png);
        assert_eq!("jpg".parse::<CaptureFormat>().unwrap(), CaptureFormat::Jpeg);
        assert_eq!("jpeg".parse::<CaptureFormat>().unwrap(), CaptureFormat::Jpeg);
        assert_eq!(
            "JPEG".parse::<CaptureFormat>().unwrap(),
            CaptureFormat::Jpeg
        );

        let err = "webp".parse::<CaptureFormat>().unwrap_err().to_string();
        assert!(err.contains("webp"));
    }

    #[test]
    fn format_extensions() {
        assert_eq!(CaptureFormat::Png.extension(), "png");
        assert_eq!(CaptureFormat::Jpeg.extension(), "jpg");
        assert_eq!(CaptureFormat::default(), CaptureFormat::Png);
    }

    #[test]
    fn conversion_swaps_bgr_to_rgb() {
        let frame = solid_frame(2, 2, (0x10, 0x20, 0x30));
        let rgba = to_rgba(&frame).unwrap();
        assert_eq!(rgba.get_pixel(0, 0).0, [0x10, 0x20, 0x30, 0xFF]);

        let rgb = to_rgb_bytes(&frame).unwrap();
        assert_eq!(&rgb[..3], &[0x10, 0x20, 0x30]);
        assert_eq!(rgb.len(), 2 * 2 * 3);
    }

    #[test]
    fn unsupported_depth_is_refused() {
        let frame = RawFrame::new(2, 2, 16, vec![0; 16]).unwrap();
        let err = to_rgba(&frame).unwrap_err().to_string();
        assert!(err.contains("depth 16"));
    }

    #[test]
    fn padded_rows_do_not_leak_into_output() {
        // 1 pixel per row plus 4 bytes of row padding.
        let data = vec![
            0x30, 0x20, 0x10, 0x00, 0xAA, 0xAA, 0xAA, 0xAA, // row 0
            0x30, 0x20, 0x10, 0x00, 0xAA, 0xAA, 0xAA, 0xAA, // row 1
        ];
        let frame = RawFrame::new(1, 2, 24, data).unwrap();
        let rgb = to_rgb_bytes(&frame).unwrap();
        assert_eq!(rgb, vec![0x10, 0x20, 0x30, 0x10, 0x20, 0x30]);
    }
}
