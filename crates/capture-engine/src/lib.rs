//! PipeWrench Capture Engine
//!
//! Turns windows and screens of an X11 display into image files. The
//! engine reads raw frames through a chain of capture techniques and
//! encodes the validated survivors into the captures directory.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              CaptureService                  │
//! │  ┌──────────────────────────────────────┐   │
//! │  │              Capturer                │   │
//! │  │  composite, copy-area, direct read,  │   │
//! │  │  root-region fallback                │   │
//! │  └──────────────┬───────────────────────┘   │
//! │                 ▼ RawFrame                  │
//! │  ┌──────────┐       ┌──────────────────┐    │
//! │  │ encoder  │──────▶│   CaptureStore   │    │
//! │  │ png/jpeg │       │ window_<stamp>.* │    │
//! │  └──────────┘       └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```

pub mod capture;
pub mod encoder;
pub mod frame;
pub mod sentinel;
pub mod service;
pub mod store;

pub use capture::{CaptureTechnique, Capturer};
pub use encoder::{CaptureFormat, DEFAULT_JPEG_QUALITY};
pub use frame::RawFrame;
pub use service::{CaptureOptions, CaptureService};
pub use store::{CaptureFile, CaptureKind, CaptureStore};
