//! PipeWrench X11 platform layer.
//!
//! This crate owns everything that talks to the X server directly:
//!
//! - **[`session::DisplaySession`]**: the connection, opened once and
//!   shared by reference with every dependent component.
//! - **[`windows::list_windows`]**: enumeration of capturable top-level
//!   windows.
//! - **[`screens::detect_screens`]**: monitor/output detection with the
//!   synthetic "All Screens" aggregate entry.
//! - **[`events::WindowWatcher`]**: the poll-and-coalesce watcher that
//!   reports window-list changes.
//!
//! Descriptor types returned by enumeration are plain serde-able data;
//! they never borrow from the session that produced them.

pub mod events;
pub mod screens;
pub mod session;
pub mod windows;

use serde::{Deserialize, Serialize};

pub use events::{WindowListChanged, WindowWatcher};
pub use screens::detect_screens;
pub use session::DisplaySession;
pub use windows::list_windows;

/// Index of the synthetic aggregate entry returned by `detect_screens`.
pub const ALL_SCREENS_INDEX: i32 = -1;

/// Name of the synthetic aggregate entry.
pub const ALL_SCREENS_NAME: &str = "All Screens";

/// A capturable top-level window.
///
/// Constructed fresh on every enumeration and never mutated; the `id` is
/// only as stable as the underlying X window, so descriptors from an old
/// enumeration must be re-validated before capture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowDescriptor {
    /// X11 window handle (XID).
    pub id: u32,
    /// Window title; empty when the window publishes none.
    pub title: String,
    /// Class half of the `WM_CLASS` pair, when set.
    pub wm_class: Option<String>,
    /// Position in root-window coordinates (pixels).
    pub x: i32,
    pub y: i32,
    /// Size in pixels.
    pub width: u32,
    pub height: u32,
    /// Whether the window was viewable at enumeration time.
    pub visible: bool,
}

impl WindowDescriptor {
    /// Geometry as a `(x, y, width, height)` rectangle.
    pub fn rect(&self) -> (i32, i32, u32, u32) {
        (self.x, self.y, self.width, self.height)
    }

    /// A window is listable only if it has a title or a WM class.
    pub fn has_identity(&self) -> bool {
        !self.title.is_empty()
            || self
                .wm_class
                .as_deref()
                .is_some_and(|class| !class.is_empty())
    }
}

/// A detected screen or output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenDescriptor {
    /// Output index; [`ALL_SCREENS_INDEX`] marks the aggregate entry.
    pub index: i32,
    /// Human-readable name (output name, or "Screen N" for legacy screens).
    pub name: String,
    /// Position in the virtual desktop (pixels).
    pub x: i32,
    pub y: i32,
    /// Size in pixels.
    pub width: u32,
    pub height: u32,
}

impl ScreenDescriptor {
    /// Whether this is the synthetic "All Screens" entry.
    pub fn is_aggregate(&self) -> bool {
        self.index == ALL_SCREENS_INDEX
    }

    /// Geometry as a `(x, y, width, height)` rectangle.
    pub fn rect(&self) -> (i32, i32, u32, u32) {
        (self.x, self.y, self.width, self.height)
    }
}

/// Compute virtual desktop bounds that include all given screens.
/// Returns `(min_x, min_y, width, height)` in pixels; a zero-sized
/// rectangle when the slice is empty.
pub fn virtual_desktop_bounds(screens: &[ScreenDescriptor]) -> (i32, i32, u32, u32) {
    if screens.is_empty() {
        return (0, 0, 0, 0);
    }

    let min_x = screens.iter().map(|s| s.x).min().unwrap_or(0);
    let min_y = screens.iter().map(|s| s.y).min().unwrap_or(0);
    let max_x = screens
        .iter()
        .map(|s| s.x + s.width as i32)
        .max()
        .unwrap_or(0);
    let max_y = screens
        .iter()
        .map(|s| s.y + s.height as i32)
        .max()
        .unwrap_or(0);

    let width = (max_x - min_x).max(1) as u32;
    let height = (max_y - min_y).max(1) as u32;
    (min_x, min_y, width, height)
}
