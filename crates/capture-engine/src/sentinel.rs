//! Sentinel colors for validating capture output.
//!
//! The staged capture paths pre-fill their scratch pixmap with a marker
//! color before asking the server to copy window contents over it. If the
//! copy silently fails (unmapped window, unredirected pixmap, BadMatch
//! swallowed by the server) the marker survives and the frame is rejected
//! instead of being saved as a solid rectangle.

use crate::frame::RawFrame;

/// Fill color for the composite named-pixmap path.
pub const COMPOSITE_SENTINEL: (u8, u8, u8) = (0xFF, 0x00, 0xFF);

/// Fill color for the copy-area path.
pub const COPY_AREA_SENTINEL: (u8, u8, u8) = (0x00, 0xFF, 0xFF);

/// Black, used to reject direct reads of obscured or unmapped windows.
pub const SOLID_BLACK: (u8, u8, u8) = (0x00, 0x00, 0x00);

/// Sample grid resolution along each axis.
const GRID_SAMPLES: u32 = 32;

/// Fraction of sampled pixels allowed to differ before a frame stops
/// counting as "mostly" the probe color. Window borders and shadows leak
/// a few genuine pixels into otherwise failed copies.
const OUTLIER_TOLERANCE: f64 = 0.02;

/// The 32-bit pixel value for an RGB color at depth 24/32, as passed to
/// the server when filling a pixmap.
pub fn pixel_value(rgb: (u8, u8, u8)) -> u32 {
    let (r, g, b) = rgb;
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Whether the frame is near-uniformly the given color.
///
/// Samples a coarse grid rather than every pixel; a failed copy leaves
/// the whole surface filled, so sparse sampling is enough to tell. Frames
/// in a layout other than BGRx are never rejected here, the encoder deals
/// with those.
pub fn is_mostly_color(frame: &RawFrame, color: (u8, u8, u8)) -> bool {
    if !frame.is_bgrx() {
        return false;
    }

    let step_x = (frame.width() / GRID_SAMPLES).max(1);
    let step_y = (frame.height() / GRID_SAMPLES).max(1);

    let mut sampled = 0u32;
    let mut outliers = 0u32;
    let mut y = 0;
    while y < frame.height() {
        let mut x = 0;
        while x < frame.width() {
            sampled += 1;
            if frame.pixel_rgb(x, y) != color {
                outliers += 1;
            }
            x += step_x;
        }
        y += step_y;
    }

    f64::from(outliers) <= f64::from(sampled) * OUTLIER_TOLERANCE
}
