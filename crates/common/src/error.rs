//! Error types shared across PipeWrench crates.

use std::path::PathBuf;

/// Top-level error type for PipeWrench operations.
#[derive(Debug, thiserror::Error)]
pub enum PipewrenchError {
    #[error("Display error: {message}")]
    Display { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PipewrenchError.
pub type PipewrenchResult<T> = Result<T, PipewrenchError>;

impl PipewrenchError {
    pub fn display(msg: impl Into<String>) -> Self {
        Self::Display {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
