//! Window and screen capture with a technique fallback chain.
//!
//! No single X11 read works for every window: compositors keep offscreen
//! pixmaps, bare window managers do not, and obscured windows return
//! garbage from direct reads. [`Capturer::capture_window`] therefore runs
//! a fixed chain of techniques, validates each result against a sentinel
//! fill, and falls back to cropping the root window as the last resort.

use std::sync::Arc;

use pipewrench_common::error::{PipewrenchError, PipewrenchResult};
use pipewrench_platform_x11::session::{DisplaySession, WindowGeometry};
use pipewrench_platform_x11::{ScreenDescriptor, WindowDescriptor};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::composite::{self, ConnectionExt as _, Redirect};
use x11rb::protocol::xproto::{
    ConnectionExt as _, CreateGCAux, Drawable, GetImageReply, ImageFormat, Rectangle, Window,
};

use crate::frame::RawFrame;
use crate::sentinel::{self, COMPOSITE_SENTINEL, COPY_AREA_SENTINEL, SOLID_BLACK};

/// How a frame was (or is about to be) obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTechnique {
    /// Composite-redirect the window and read its offscreen pixmap.
    CompositeRedirect,
    /// Server-side copy of the window into a staging pixmap.
    CopyArea,
    /// Direct `GetImage` on the window drawable.
    DirectRead,
    /// Crop of the root window at the window's last known placement.
    RootRegion,
}

impl CaptureTechnique {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureTechnique::CompositeRedirect => "composite-redirect",
            CaptureTechnique::CopyArea => "copy-area",
            CaptureTechnique::DirectRead => "direct-read",
            CaptureTechnique::RootRegion => "root-region",
        }
    }
}

type AttemptFn = fn(&Capturer, Window, &WindowGeometry) -> PipewrenchResult<Option<RawFrame>>;

/// Window techniques in preference order. Root-region is not listed; it
/// is the unconditional fallback, not an attempt that can be rejected.
const WINDOW_ATTEMPTS: [(CaptureTechnique, AttemptFn); 3] = [
    (
        CaptureTechnique::CompositeRedirect,
        Capturer::composite_attempt,
    ),
    (CaptureTechnique::CopyArea, Capturer::copy_area_attempt),
    (CaptureTechnique::DirectRead, Capturer::direct_read_attempt),
];

/// Captures raw frames from windows and screens of one display session.
pub struct Capturer {
    session: Arc<DisplaySession>,
}

impl Capturer {
    pub fn new(session: Arc<DisplaySession>) -> Self {
        Self { session }
    }

    /// Capture one window, trying each technique in order.
    ///
    /// An attempt can fail with a protocol error or be rejected because
    /// its output is still the sentinel fill; either way the next
    /// technique runs. When all of them are exhausted (or the window is
    /// not viewable to begin with) the root window is cropped at the
    /// window's placement instead.
    pub fn capture_window(&self, window: &WindowDescriptor) -> PipewrenchResult<RawFrame> {
        let geometry = match self.session.window_geometry(window.id) {
            Ok(geometry) => geometry,
            Err(e) => {
                // The window may have been destroyed since enumeration;
                // its recorded placement still lets the root fallback run.
                tracing::debug!(
                    window = window.id,
                    error = %e,
                    "Live geometry unavailable, using placement from enumeration"
                );
                let (x, y, width, height) = window.rect();
                WindowGeometry {
                    x,
                    y,
                    width,
                    height,
                    depth: self.session.screen().root_depth,
                }
            }
        };
        if geometry.width == 0 || geometry.height == 0 {
            return Err(PipewrenchError::capture(format!(
                "Window 0x{:x} has no area to capture",
                window.id
            )));
        }

        if self.session.is_viewable(window.id) {
            for (technique, attempt) in WINDOW_ATTEMPTS {
                match attempt(self, window.id, &geometry) {
                    Ok(Some(frame)) => {
                        tracing::debug!(
                            window = window.id,
                            technique = technique.as_str(),
                            "Capture accepted"
                        );
                        return Ok(frame);
                    }
                    Ok(None) => {
                        tracing::debug!(
                            window = window.id,
                            technique = technique.as_str(),
                            "Capture rejected, trying next technique"
                        );
                    }
                    Err(e) => {
                        tracing::debug!(
                            window = window.id,
                            technique = technique.as_str(),
                            error = %e,
                            "Capture failed, trying next technique"
                        );
                    }
                }
            }
            tracing::warn!(
                window = window.id,
                "All window techniques failed, cropping root window instead"
            );
        } else {
            tracing::debug!(
                window = window.id,
                "Window not viewable, cropping root window at its placement"
            );
        }

        self.root_region(geometry.rect())
    }

    /// Capture one detected screen by index.
    ///
    /// `screens` is the list returned by screen detection; the aggregate
    /// entry captures the whole virtual desktop.
    pub fn capture_screen(
        &self,
        screens: &[ScreenDescriptor],
        index: i32,
    ) -> PipewrenchResult<RawFrame> {
        let screen = find_screen(screens, index)?;
        tracing::debug!(index, name = %screen.name, "Capturing screen region");
        self.root_region(screen.rect())
    }

    fn composite_attempt(
        &self,
        window: Window,
        geometry: &WindowGeometry,
    ) -> PipewrenchResult<Option<RawFrame>> {
        let conn = self.session.conn();
        if conn
            .extension_information(composite::X11_EXTENSION_NAME)
            .map_err(|e| PipewrenchError::display(format!("Extension query failed: {e}")))?
            .is_none()
        {
            tracing::debug!("Composite extension not present");
            return Ok(None);
        }

        conn.composite_redirect_window(window, Redirect::AUTOMATIC)
            .map_err(|e| {
                PipewrenchError::capture(format!("Composite redirect request failed: {e}"))
            })?
            .check()
            .map_err(|e| PipewrenchError::capture(format!("Composite redirect refused: {e}")))?;

        let result = self.composite_read(window, geometry);

        // Undo the redirect whether or not the read worked.
        let _ = conn.composite_unredirect_window(window, Redirect::AUTOMATIC);
        let _ = conn.flush();

        result
    }

    fn composite_read(
        &self,
        window: Window,
        geometry: &WindowGeometry,
    ) -> PipewrenchResult<Option<RawFrame>> {
        let conn = self.session.conn();
        let named = conn
            .generate_id()
            .map_err(|e| PipewrenchError::capture(format!("Id allocation failed: {e}")))?;
        conn.composite_name_window_pixmap(window, named)
            .map_err(|e| PipewrenchError::capture(format!("Pixmap naming request failed: {e}")))?
            .check()
            .map_err(|e| PipewrenchError::capture(format!("Window has no backing pixmap: {e}")))?;

        let result = self.read_via_staging(named, geometry, COMPOSITE_SENTINEL);
        let _ = conn.free_pixmap(named);
        result
    }

    fn copy_area_attempt(
        &self,
        window: Window,
        geometry: &WindowGeometry,
    ) -> PipewrenchResult<Option<RawFrame>> {
        self.read_via_staging(window, geometry, COPY_AREA_SENTINEL)
    }

    /// Copy the source drawable into a sentinel-filled staging pixmap and
    /// read the staging pixmap back.
    ///
    /// The copy itself is sent unchecked: if the server refuses it (an
    /// unmapped source gives BadMatch) the staging surface keeps its fill
    /// and the frame is rejected as `Ok(None)`.
    fn read_via_staging(
        &self,
        source: Drawable,
        geometry: &WindowGeometry,
        sentinel_color: (u8, u8, u8),
    ) -> PipewrenchResult<Option<RawFrame>> {
        let conn = self.session.conn();
        let width = geometry.width as u16;
        let height = geometry.height as u16;

        let staging = conn
            .generate_id()
            .map_err(|e| PipewrenchError::capture(format!("Id allocation failed: {e}")))?;
        let gc = conn
            .generate_id()
            .map_err(|e| PipewrenchError::capture(format!("Id allocation failed: {e}")))?;
        conn.create_pixmap(geometry.depth, staging, self.session.root(), width, height)
            .map_err(|e| PipewrenchError::capture(format!("Staging pixmap request failed: {e}")))?
            .check()
            .map_err(|e| PipewrenchError::capture(format!("Staging pixmap creation failed: {e}")))?;

        let copied: PipewrenchResult<GetImageReply> = (|| {
            conn.create_gc(
                gc,
                staging,
                &CreateGCAux::new()
                    .foreground(sentinel::pixel_value(sentinel_color))
                    .graphics_exposures(0),
            )
            .map_err(|e| PipewrenchError::capture(format!("GC request failed: {e}")))?
            .check()
            .map_err(|e| PipewrenchError::capture(format!("GC creation failed: {e}")))?;

            conn.poly_fill_rectangle(
                staging,
                gc,
                &[Rectangle {
                    x: 0,
                    y: 0,
                    width,
                    height,
                }],
            )
            .map_err(|e| PipewrenchError::capture(format!("Sentinel fill failed: {e}")))?;

            conn.copy_area(source, staging, gc, 0, 0, 0, 0, width, height)
                .map_err(|e| PipewrenchError::capture(format!("Copy request failed: {e}")))?;

            conn.get_image(ImageFormat::Z_PIXMAP, staging, 0, 0, width, height, !0)
                .map_err(|e| PipewrenchError::capture(format!("Image request failed: {e}")))?
                .reply()
                .map_err(|e| PipewrenchError::capture(format!("Staging read failed: {e}")))
        })();

        let _ = conn.free_gc(gc);
        let _ = conn.free_pixmap(staging);

        let reply = copied?;
        let frame = RawFrame::new(geometry.width, geometry.height, reply.depth, reply.data)?;
        if sentinel::is_mostly_color(&frame, sentinel_color) {
            tracing::debug!("Staging surface still shows its sentinel fill");
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn direct_read_attempt(
        &self,
        window: Window,
        geometry: &WindowGeometry,
    ) -> PipewrenchResult<Option<RawFrame>> {
        let reply = self
            .session
            .conn()
            .get_image(
                ImageFormat::Z_PIXMAP,
                window,
                0,
                0,
                geometry.width as u16,
                geometry.height as u16,
                !0,
            )
            .map_err(|e| PipewrenchError::capture(format!("Image request failed: {e}")))?
            .reply()
            .map_err(|e| PipewrenchError::capture(format!("Direct window read failed: {e}")))?;

        let frame = RawFrame::new(geometry.width, geometry.height, reply.depth, reply.data)?;
        // Obscured or freshly-mapped windows read back all black.
        if sentinel::is_mostly_color(&frame, SOLID_BLACK) {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    /// Read a rectangle of the root window, clamped to the root bounds.
    fn root_region(&self, rect: (i32, i32, u32, u32)) -> PipewrenchResult<RawFrame> {
        let screen = self.session.screen();
        let (x, y, width, height) = clamp_to_root(
            rect,
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        )
        .ok_or_else(|| {
            PipewrenchError::capture(format!(
                "Region {}x{} at ({}, {}) is entirely off screen",
                rect.2, rect.3, rect.0, rect.1
            ))
        })?;

        let reply = self
            .session
            .conn()
            .get_image(
                ImageFormat::Z_PIXMAP,
                self.session.root(),
                x,
                y,
                width,
                height,
                !0,
            )
            .map_err(|e| PipewrenchError::capture(format!("Image request failed: {e}")))?
            .reply()
            .map_err(|e| PipewrenchError::capture(format!("Root region read failed: {e}")))?;

        RawFrame::new(u32::from(width), u32::from(height), reply.depth, reply.data)
    }
}

fn find_screen(screens: &[ScreenDescriptor], index: i32) -> PipewrenchResult<&ScreenDescriptor> {
    screens.iter().find(|s| s.index == index).ok_or_else(|| {
        PipewrenchError::capture(format!(
            "Screen index {index} not found. Available screens: {}",
            screen_list_for_error(screens)
        ))
    })
}

fn screen_list_for_error(screens: &[ScreenDescriptor]) -> String {
    if screens.is_empty() {
        return "none detected".to_string();
    }
    screens
        .iter()
        .map(|s| format!("{} ({})", s.index, s.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Intersect a capture rectangle with the root window bounds.
///
/// Off-screen portions of a window cannot be read from the root, so the
/// rectangle shrinks to the visible part. `None` when nothing overlaps.
fn clamp_to_root(
    rect: (i32, i32, u32, u32),
    root_width: u32,
    root_height: u32,
) -> Option<(i16, i16, u16, u16)> {
    let (x, y, width, height) = rect;
    let left = x.max(0);
    let top = y.max(0);
    let right = (x + width as i32).min(root_width as i32);
    let bottom = (y + height as i32).min(root_height as i32);
    if right <= left || bottom <= top {
        return None;
    }
    Some((
        left as i16,
        top as i16,
        (right - left) as u16,
        (bottom - top) as u16,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipewrench_platform_x11::{ALL_SCREENS_INDEX, ALL_SCREENS_NAME};
    use proptest::prelude::*;

    fn screen(index: i32, name: &str, x: i32, y: i32, width: u32, height: u32) -> ScreenDescriptor {
        ScreenDescriptor {
            index,
            name: name.to_string(),
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn window_techniques_run_in_documented_order() {
        let order: Vec<CaptureTechnique> = WINDOW_ATTEMPTS.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            order,
            vec![
                CaptureTechnique::CompositeRedirect,
                CaptureTechnique::CopyArea,
                CaptureTechnique::DirectRead,
            ]
        );
    }

    #[test]
    fn unknown_screen_index_lists_what_is_available() {
        let screens = vec![
            screen(ALL_SCREENS_INDEX, ALL_SCREENS_NAME, 0, 0, 3840, 1080),
            screen(0, "HDMI-1", 0, 0, 1920, 1080),
            screen(1, "DP-1", 1920, 0, 1920, 1080),
        ];

        assert_eq!(find_screen(&screens, ALL_SCREENS_INDEX).unwrap().name, ALL_SCREENS_NAME);
        assert_eq!(find_screen(&screens, 1).unwrap().name, "DP-1");

        let err = find_screen(&screens, 7).unwrap_err().to_string();
        assert!(err.contains("Screen index 7 not found"));
        assert!(err.contains("-1 (All Screens)"));
        assert!(err.contains("1 (DP-1)"));

        let err = find_screen(&[], 0).unwrap_err().to_string();
        assert!(err.contains("none detected"));
    }

    #[test]
    fn clamping_trims_offscreen_edges() {
        // Fully inside: untouched.
        assert_eq!(
            clamp_to_root((10, 20, 300, 200), 1920, 1080),
            Some((10, 20, 300, 200))
        );
        // Hanging off the top-left corner.
        assert_eq!(
            clamp_to_root((-50, -30, 300, 200), 1920, 1080),
            Some((0, 0, 250, 170))
        );
        // Hanging off the bottom-right corner.
        assert_eq!(
            clamp_to_root((1800, 1000, 300, 200), 1920, 1080),
            Some((1800, 1000, 120, 80))
        );
        // Entirely outside.
        assert_eq!(clamp_to_root((2000, 0, 300, 200), 1920, 1080), None);
        assert_eq!(clamp_to_root((0, -500, 300, 200), 1920, 1080), None);
    }

    proptest! {
        #[test]
        fn clamped_rectangles_stay_inside_the_root(
            x in -3000i32..3000,
            y in -3000i32..3000,
            width in 1u32..2000,
            height in 1u32..2000,
        ) {
            if let Some((cx, cy, cw, ch)) = clamp_to_root((x, y, width, height), 1920, 1080) {
                prop_assert!(cx >= 0);
                prop_assert!(cy >= 0);
                prop_assert!(cw >= 1);
                prop_assert!(ch >= 1);
                prop_assert!(i32::from(cx) + i32::from(cw) <= 1920);
                prop_assert!(i32::from(cy) + i32::from(ch) <= 1080);
            }
        }
    }
}
