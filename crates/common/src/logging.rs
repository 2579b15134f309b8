//! Logging setup for the PipeWrench tools.

use std::fs::File;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global tracing subscriber.
///
/// The `RUST_LOG` environment variable overrides the configured level
/// when present. JSON mode emits one object per line for log shippers;
/// plain mode prints human-readable lines. A configured log file
/// receives the output instead of the terminal.
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file = config
        .file
        .as_ref()
        .and_then(|path| match File::create(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Cannot open log file {}: {e}", path.display());
                None
            }
        });

    // The builder's concrete type changes with every option, so each
    // combination finishes on its own. Re-initialization keeps the
    // first subscriber.
    match (config.json, file) {
        (true, Some(file)) => {
            tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .json()
                    .with_writer(Mutex::new(file))
                    .finish(),
            )
            .ok();
        }
        (true, None) => {
            tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .json()
                    .finish(),
            )
            .ok();
        }
        (false, Some(file)) => {
            tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .finish(),
            )
            .ok();
        }
        (false, None) => {
            tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_target(true)
                    .finish(),
            )
            .ok();
        }
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
