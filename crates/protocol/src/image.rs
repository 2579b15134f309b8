//! The image publish payload.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use pipewrench_common::error::{PipewrenchError, PipewrenchResult};
use serde::{Deserialize, Serialize};

/// Timestamp layout used on the wire (ISO-8601, UTC).
const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A published capture: metadata plus the image file itself, base64
/// encoded so the whole thing travels as one JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// File name of the capture, without its directory.
    pub filename: String,
    /// Title of the captured window; empty for screen captures.
    pub window_title: String,
    /// What initiated the capture ("manual", "timer", ...).
    pub trigger_type: String,
    /// When the payload was built, ISO-8601 UTC.
    pub timestamp: String,
    /// Standard base64 of the encoded image bytes, no line wrapping.
    pub image_data: String,
}

impl ImagePayload {
    /// Build a payload from an image file on disk, stamped with the
    /// current time.
    pub fn from_file(
        path: &Path,
        window_title: impl Into<String>,
        trigger_type: impl Into<String>,
    ) -> PipewrenchResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipewrenchError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => PipewrenchError::Io(e),
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            filename,
            window_title: window_title.into(),
            trigger_type: trigger_type.into(),
            timestamp: Utc::now().format(WIRE_TIMESTAMP_FORMAT).to_string(),
            image_data: STANDARD.encode(&bytes),
        })
    }

    /// Decode the carried image back into raw file bytes.
    pub fn decode_image(&self) -> PipewrenchResult<Vec<u8>> {
        STANDARD.decode(&self.image_data).map_err(|e| {
            PipewrenchError::protocol(format!("Image payload is not valid base64: {e}"))
        })
    }

    pub fn encode(&self) -> PipewrenchResult<String> {
        serde_json::to_string(self)
            .map_err(|e| PipewrenchError::protocol(format!("Failed to encode image payload: {e}")))
    }

    pub fn decode(raw: &str) -> PipewrenchResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| PipewrenchError::protocol(format!("Malformed image payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn sample() -> ImagePayload {
        ImagePayload {
            filename: "window_20250614_154233.png".to_string(),
            window_title: "Terminal".to_string(),
            trigger_type: "manual".to_string(),
            timestamp: "2025-06-14T15:42:33Z".to_string(),
            image_data: STANDARD.encode(b"not really a png"),
        }
    }

    #[test]
    fn payloads_round_trip_through_json() {
        let payload = sample();
        let raw = payload.encode().unwrap();
        assert_eq!(ImagePayload::decode(&raw).unwrap(), payload);
        assert_eq!(payload.decode_image().unwrap(), b"not really a png");
    }

    #[test]
    fn wire_field_names_are_stable() {
        let value: serde_json::Value =
            serde_json::from_str(&sample().encode().unwrap()).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "filename",
            "window_title",
            "trigger_type",
            "timestamp",
            "image_data",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert_eq!(object.len(), 5);
    }

    #[test]
    fn from_file_encodes_without_line_breaks() {
        let path = std::env::temp_dir().join(format!(
            "pipewrench-payload-{}.png",
            std::process::id()
        ));
        std::fs::write(&path, vec![0xAB; 4096]).unwrap();

        let payload = ImagePayload::from_file(&path, "Some Window", "manual").unwrap();
        assert_eq!(
            payload.filename,
            path.file_name().unwrap().to_string_lossy()
        );
        assert!(!payload.image_data.contains('\n'));
        assert_eq!(payload.decode_image().unwrap().len(), 4096);
        assert!(
            NaiveDateTime::parse_from_str(&payload.timestamp, WIRE_TIMESTAMP_FORMAT).is_ok(),
            "unexpected timestamp shape: {}",
            payload.timestamp
        );

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_files_name_the_path() {
        let err = ImagePayload::from_file(Path::new("/nowhere/at/all.png"), "", "manual")
            .unwrap_err()
            .to_string();
        assert!(err.contains("/nowhere/at/all.png"));
    }

    #[test]
    fn corrupt_base64_is_an_error() {
        let mut payload = sample();
        payload.image_data = "@@not base64@@".to_string();
        assert!(payload.decode_image().is_err());
    }
}
