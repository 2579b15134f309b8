//! Display session: the owned connection to the X server.

use pipewrench_common::error::{PipewrenchError, PipewrenchResult};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt as _, Screen, Window};
use x11rb::rust_connection::RustConnection;

x11rb::atom_manager! {
    /// Atoms interned once when the session opens.
    pub Atoms:
    AtomsCookie {
        _NET_WM_NAME,
        _NET_CLIENT_LIST,
        UTF8_STRING,
    }
}

/// An open connection to the X server.
///
/// Constructed once at startup and passed by reference (or `Arc`) into the
/// enumerator, capturer, and watcher. Dropping the session closes the
/// connection.
pub struct DisplaySession {
    conn: RustConnection,
    screen_num: usize,
    atoms: Atoms,
}

impl DisplaySession {
    /// Connect to the display named by `$DISPLAY`.
    pub fn open() -> PipewrenchResult<Self> {
        let (conn, screen_num) = RustConnection::connect(None).map_err(|e| {
            PipewrenchError::display(format!("Failed to connect to X server: {e}"))
        })?;
        let atoms = Atoms::new(&conn)
            .map_err(|e| PipewrenchError::display(format!("Failed to request atoms: {e}")))?
            .reply()
            .map_err(|e| PipewrenchError::display(format!("Failed to intern atoms: {e}")))?;

        tracing::debug!(screen = screen_num, "Connected to X server");
        Ok(Self {
            conn,
            screen_num,
            atoms,
        })
    }

    pub fn conn(&self) -> &RustConnection {
        &self.conn
    }

    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    /// The screen this session was opened on.
    pub fn screen(&self) -> &Screen {
        &self.conn.setup().roots[self.screen_num]
    }

    /// Root window of the session's screen.
    pub fn root(&self) -> Window {
        self.screen().root
    }

    /// Fetch a window's title: `_NET_WM_NAME` first, core `WM_NAME` as the
    /// fallback for clients that never learned EWMH.
    pub fn window_title(&self, window: Window) -> Option<String> {
        self.read_text_property(window, self.atoms._NET_WM_NAME, self.atoms.UTF8_STRING)
            .or_else(|| {
                self.read_text_property(window, AtomEnum::WM_NAME.into(), AtomEnum::ANY.into())
            })
            .filter(|title| !title.is_empty())
    }

    /// Fetch the class half of a window's `WM_CLASS` pair.
    pub fn window_class(&self, window: Window) -> Option<String> {
        let reply = self
            .conn
            .get_property(
                false,
                window,
                AtomEnum::WM_CLASS,
                AtomEnum::STRING,
                0,
                1024,
            )
            .ok()?
            .reply()
            .ok()?;
        if reply.value.is_empty() {
            return None;
        }
        // WM_CLASS is two NUL-terminated strings: instance, then class.
        let mut parts = reply.value.split(|&b| b == 0).filter(|p| !p.is_empty());
        let instance = parts.next();
        let class = parts.next().or(instance)?;
        Some(String::from_utf8_lossy(class).into_owned())
    }

    /// Absolute geometry of a window, in root coordinates.
    pub fn window_geometry(&self, window: Window) -> PipewrenchResult<WindowGeometry> {
        let geometry = self
            .conn
            .get_geometry(window)
            .map_err(|e| PipewrenchError::display(format!("Geometry request failed: {e}")))?
            .reply()
            .map_err(|e| PipewrenchError::display(format!("Geometry query failed: {e}")))?;
        let coords = self
            .conn
            .translate_coordinates(window, self.root(), 0, 0)
            .map_err(|e| PipewrenchError::display(format!("Coordinate request failed: {e}")))?
            .reply()
            .map_err(|e| {
                PipewrenchError::display(format!("Coordinate translation failed: {e}"))
            })?;

        Ok(WindowGeometry {
            x: coords.dst_x as i32,
            y: coords.dst_y as i32,
            width: geometry.width as u32,
            height: geometry.height as u32,
            depth: geometry.depth,
        })
    }

    /// Whether the server advertises the named extension.
    pub fn extension_present(&self, name: &'static str) -> bool {
        self.conn
            .extension_information(name)
            .ok()
            .flatten()
            .is_some()
    }

    /// Whether the window is currently mapped and viewable.
    pub fn is_viewable(&self, window: Window) -> bool {
        use x11rb::protocol::xproto::MapState;

        self.conn
            .get_window_attributes(window)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map(|attrs| attrs.map_state == MapState::VIEWABLE)
            .unwrap_or(false)
    }

    fn read_text_property(&self, window: Window, property: Atom, type_: Atom) -> Option<String> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, 1024)
            .ok()?
            .reply()
            .ok()?;
        if reply.value.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&reply.value).into_owned())
    }
}

/// Absolute geometry of a window, in root coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Color depth of the window's drawable.
    pub depth: u8,
}

impl WindowGeometry {
    pub fn rect(&self) -> (i32, i32, u32, u32) {
        (self.x, self.y, self.width, self.height)
    }
}
