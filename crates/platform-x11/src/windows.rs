//! Top-level window enumeration.

use pipewrench_common::error::{PipewrenchError, PipewrenchResult};
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt as _, MapState, Window};

use crate::session::DisplaySession;
use crate::WindowDescriptor;

/// Placeholder some toolkits use for windows without a real title; treated
/// as no title at all.
pub const UNNAMED_PLACEHOLDER: &str = "[Unnamed Window]";

/// List capturable top-level windows, sorted alphabetically by title.
///
/// Enumeration problems are not surfaced as errors: a dead display or a
/// failed tree query logs a warning and yields an empty list, matching the
/// behavior callers expect when refreshing a selection list.
pub fn list_windows(session: &DisplaySession) -> Vec<WindowDescriptor> {
    match try_list_windows(session) {
        Ok(windows) => windows,
        Err(e) => {
            tracing::warn!("Window enumeration unavailable: {e}");
            Vec::new()
        }
    }
}

fn try_list_windows(session: &DisplaySession) -> PipewrenchResult<Vec<WindowDescriptor>> {
    let candidates = match client_list(session)? {
        Some(managed) => managed,
        None => root_children(session)?,
    };

    let mut windows: Vec<WindowDescriptor> = candidates
        .into_iter()
        .filter_map(|window| describe_window(session, window))
        .collect();

    windows.sort_by(|a, b| a.title.cmp(&b.title));
    tracing::debug!(count = windows.len(), "Enumerated windows");
    Ok(windows)
}

/// Managed top-level windows from `_NET_CLIENT_LIST`, when the window
/// manager publishes it.
fn client_list(session: &DisplaySession) -> PipewrenchResult<Option<Vec<Window>>> {
    let reply = session
        .conn()
        .get_property(
            false,
            session.root(),
            session.atoms()._NET_CLIENT_LIST,
            AtomEnum::WINDOW,
            0,
            u32::MAX,
        )
        .map_err(|e| PipewrenchError::display(format!("Client list request failed: {e}")))?
        .reply()
        .map_err(|e| PipewrenchError::display(format!("Client list query failed: {e}")))?;

    Ok(reply.value32().map(|values| values.collect()))
}

/// All direct children of the root window; the fallback source when no
/// EWMH window manager is running.
fn root_children(session: &DisplaySession) -> PipewrenchResult<Vec<Window>> {
    let reply = session
        .conn()
        .query_tree(session.root())
        .map_err(|e| PipewrenchError::display(format!("Window tree request failed: {e}")))?
        .reply()
        .map_err(|e| PipewrenchError::display(format!("Window tree query failed: {e}")))?;
    Ok(reply.children)
}

/// Build a descriptor for one window, or `None` when the window is not a
/// capture candidate (unmapped, or lacking both title and class).
fn describe_window(session: &DisplaySession, window: Window) -> Option<WindowDescriptor> {
    let attrs = session
        .conn()
        .get_window_attributes(window)
        .ok()?
        .reply()
        .ok()?;
    if attrs.map_state != MapState::VIEWABLE {
        return None;
    }

    let title = session
        .window_title(window)
        .filter(|title| title != UNNAMED_PLACEHOLDER)
        .unwrap_or_default();
    let wm_class = session.window_class(window);

    let geometry = session.window_geometry(window).ok()?;
    let descriptor = WindowDescriptor {
        id: window,
        title,
        wm_class,
        x: geometry.x,
        y: geometry.y,
        width: geometry.width,
        height: geometry.height,
        visible: true,
    };

    descriptor.has_identity().then_some(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(title: &str, class: Option<&str>) -> WindowDescriptor {
        WindowDescriptor {
            id: 7,
            title: title.to_string(),
            wm_class: class.map(str::to_string),
            x: 0,
            y: 0,
            width: 640,
            height: 480,
            visible: true,
        }
    }

    #[test]
    fn placeholder_title_counts_as_unnamed() {
        // The same filter `describe_window` applies.
        let title = Some(UNNAMED_PLACEHOLDER.to_string())
            .filter(|t| t != UNNAMED_PLACEHOLDER)
            .unwrap_or_default();
        assert!(title.is_empty());
    }

    #[test]
    fn windows_without_identity_are_dropped() {
        assert!(!descriptor("", None).has_identity());
        assert!(descriptor("", Some("XTerm")).has_identity());
        assert!(descriptor("Terminal", None).has_identity());
    }

    #[test]
    fn listing_sorts_alphabetically_by_title() {
        let mut windows = vec![
            descriptor("zathura", None),
            descriptor("Emacs", None),
            descriptor("Terminal", None),
        ];
        windows.sort_by(|a, b| a.title.cmp(&b.title));
        let titles: Vec<&str> = windows.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Emacs", "Terminal", "zathura"]);
    }
}
