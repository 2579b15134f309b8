//! Raw frames produced by capture calls.

use pipewrench_common::error::{PipewrenchError, PipewrenchResult};

/// A raw image as read from the X server.
///
/// Pixel data is row-major in the server's native ZPixmap layout; at the
/// usual depths 24 and 32 that is 4 bytes per pixel, little-endian BGRx,
/// with rows possibly padded at the end. The frame owns its buffer;
/// passing it around is a move, releasing it is `Drop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    width: u32,
    height: u32,
    depth: u8,
    data: Vec<u8>,
}

/// ZPixmap bytes per pixel for a given depth (depth 24 packs into 32-bit
/// units).
fn bytes_per_pixel_for(depth: u8) -> usize {
    match depth {
        24 | 32 => 4,
        15 | 16 => 2,
        _ => 1,
    }
}

impl RawFrame {
    /// Wrap a server-provided pixel buffer.
    ///
    /// The buffer must hold `height` complete rows of equal stride wide
    /// enough for `width` pixels at the given depth; anything else means
    /// the reply was truncated or mismatched.
    pub fn new(width: u32, height: u32, depth: u8, data: Vec<u8>) -> PipewrenchResult<Self> {
        if width == 0 || height == 0 {
            return Err(PipewrenchError::capture(format!(
                "Empty frame ({width}x{height})"
            )));
        }
        if data.len() % height as usize != 0 {
            return Err(PipewrenchError::capture(format!(
                "Pixel buffer of {} bytes does not divide into {height} rows",
                data.len()
            )));
        }
        let stride = data.len() / height as usize;
        if stride < width as usize * bytes_per_pixel_for(depth) {
            return Err(PipewrenchError::capture(format!(
                "Row stride {stride} is too small for width {width} at depth {depth}"
            )));
        }

        Ok(Self {
            width,
            height,
            depth,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color depth reported by the server.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Raw pixel bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes between the start of one row and the next, including any
    /// trailing padding.
    pub fn stride(&self) -> usize {
        self.data.len() / self.height as usize
    }

    /// Bytes per pixel at this frame's depth.
    pub fn bytes_per_pixel(&self) -> usize {
        bytes_per_pixel_for(self.depth)
    }

    /// Whether the pixel layout is the 4-byte BGRx the rest of the engine
    /// understands.
    pub fn is_bgrx(&self) -> bool {
        self.depth == 24 || self.depth == 32
    }

    /// Read one pixel of a BGRx frame as `(r, g, b)`.
    ///
    /// `x` and `y` must be inside the frame and the layout must be BGRx
    /// (see [`RawFrame::is_bgrx`]).
    pub fn pixel_rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let offset = y as usize * self.stride() + x as usize * 4;
        let b = self.data[offset];
        let g = self.data[offset + 1];
        let r = self.data[offset + 2];
        (r, g, b)
    }
}

/// Build a solid-colored BGRx test frame.
#[cfg(test)]
pub(crate) fn solid_frame(width: u32, height: u32, rgb: (u8, u8, u8)) -> RawFrame {
    let (r, g, b) = rgb;
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        data.extend_from_slice(&[b, g, r, 0]);
    }
    RawFrame::new(width, height, 24, data).unwrap()
}
