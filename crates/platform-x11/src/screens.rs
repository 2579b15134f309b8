//! Screen and output detection.

use pipewrench_common::error::{PipewrenchError, PipewrenchResult};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::randr::{self, ConnectionExt as _};

use crate::session::DisplaySession;
use crate::{virtual_desktop_bounds, ScreenDescriptor, ALL_SCREENS_INDEX, ALL_SCREENS_NAME};

/// Detect capturable screens.
///
/// The first entry is always the synthetic "All Screens" aggregate with
/// index -1 spanning the virtual desktop; it is followed by one entry per
/// connected RandR output, or one per legacy X screen when RandR is not
/// available.
pub fn detect_screens(session: &DisplaySession) -> Vec<ScreenDescriptor> {
    let outputs = match randr_outputs(session) {
        Ok(outputs) if !outputs.is_empty() => outputs,
        Ok(_) => {
            tracing::debug!("No connected RandR outputs; using legacy screens");
            legacy_screens(session)
        }
        Err(e) => {
            tracing::debug!("RandR unavailable ({e}); using legacy screens");
            legacy_screens(session)
        }
    };

    let screens = prepend_aggregate(outputs);
    tracing::debug!(count = screens.len(), "Detected screens");
    screens
}

/// Prefix the output list with the "All Screens" aggregate entry covering
/// the union of every output's bounding box.
fn prepend_aggregate(outputs: Vec<ScreenDescriptor>) -> Vec<ScreenDescriptor> {
    let (x, y, width, height) = virtual_desktop_bounds(&outputs);
    let mut screens = Vec::with_capacity(outputs.len() + 1);
    screens.push(ScreenDescriptor {
        index: ALL_SCREENS_INDEX,
        name: ALL_SCREENS_NAME.to_string(),
        x,
        y,
        width,
        height,
    });
    screens.extend(outputs);
    screens
}

/// One entry per connected RandR output, indexed by its position in the
/// server's output list (disconnected outputs keep their slot, so indices
/// may skip).
fn randr_outputs(session: &DisplaySession) -> PipewrenchResult<Vec<ScreenDescriptor>> {
    let conn = session.conn();
    let present = conn
        .extension_information(randr::X11_EXTENSION_NAME)
        .map_err(|e| PipewrenchError::display(format!("Extension query failed: {e}")))?
        .is_some();
    if !present {
        return Ok(Vec::new());
    }

    let resources = conn
        .randr_get_screen_resources_current(session.root())
        .map_err(|e| PipewrenchError::display(format!("RandR resources request failed: {e}")))?
        .reply()
        .map_err(|e| PipewrenchError::display(format!("RandR resources query failed: {e}")))?;

    let mut screens = Vec::new();
    for (index, output) in resources.outputs.iter().enumerate() {
        let info = match conn
            .randr_get_output_info(*output, resources.config_timestamp)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
        {
            Some(info) => info,
            None => continue,
        };
        if info.connection != randr::Connection::CONNECTED || info.crtc == 0 {
            continue;
        }
        let crtc = match conn
            .randr_get_crtc_info(info.crtc, resources.config_timestamp)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
        {
            Some(crtc) => crtc,
            None => continue,
        };

        screens.push(ScreenDescriptor {
            index: index as i32,
            name: String::from_utf8_lossy(&info.name).into_owned(),
            x: crtc.x as i32,
            y: crtc.y as i32,
            width: crtc.width as u32,
            height: crtc.height as u32,
        });
    }
    Ok(screens)
}

/// One entry per X screen, for servers without RandR. Legacy screens do
/// not share a coordinate space, so each is reported at the origin.
fn legacy_screens(session: &DisplaySession) -> Vec<ScreenDescriptor> {
    session
        .conn()
        .setup()
        .roots
        .iter()
        .enumerate()
        .map(|(index, screen)| ScreenDescriptor {
            index: index as i32,
            name: format!("Screen {index}"),
            x: 0,
            y: 0,
            width: screen.width_in_pixels as u32,
            height: screen.height_in_pixels as u32,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(index: i32, x: i32, y: i32, width: u32, height: u32) -> ScreenDescriptor {
        ScreenDescriptor {
            index,
            name: format!("HDMI-{index}"),
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn aggregate_entry_comes_first_with_union_geometry() {
        let screens = prepend_aggregate(vec![
            output(0, 0, 0, 1920, 1080),
            output(1, 1920, 0, 2560, 1440),
        ]);

        assert_eq!(screens.len(), 3);
        let all = &screens[0];
        assert_eq!(all.index, ALL_SCREENS_INDEX);
        assert_eq!(all.name, ALL_SCREENS_NAME);
        assert!(all.is_aggregate());
        assert_eq!(all.rect(), (0, 0, 4480, 1440));

        let (x, y, w, h) = virtual_desktop_bounds(&screens[1..]);
        assert_eq!((all.x, all.y, all.width, all.height), (x, y, w, h));
    }

    #[test]
    fn aggregate_covers_vertically_stacked_outputs() {
        let screens = prepend_aggregate(vec![
            output(0, 0, 0, 1920, 1080),
            output(2, 0, 1080, 1920, 1200),
        ]);

        assert_eq!(screens[0].rect(), (0, 0, 1920, 2280));
        // Output indices survive as reported, including gaps.
        assert_eq!(screens[2].index, 2);
    }
}
