//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where capture files are written.
    pub captures_dir: PathBuf,

    /// Default capture settings.
    pub capture: CaptureDefaults,

    /// Message broker connection settings.
    pub broker: BrokerConfig,

    /// AI agent backend settings.
    pub agent: AgentConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default capture parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureDefaults {
    /// Output format: "png" or "jpeg".
    pub format: String,

    /// JPEG compression quality (1-100).
    pub jpeg_quality: u8,

    /// Seconds to wait before taking a capture.
    pub delay_seconds: u64,

    /// Window-event poll interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Unconditional refresh interval (seconds) used when event
    /// registration is unavailable.
    pub refresh_interval_secs: u64,
}

/// Broker connection settings mirrored by the external publish client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker hostname.
    pub host: String,

    /// Broker port.
    pub port: u16,

    /// Shared topic all envelopes travel on.
    pub topic: String,
}

/// AI backend settings relayed to the agent process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Backend type: "ollama" or "openai".
    pub backend_type: String,

    /// API key (unused for local backends).
    pub api_key: String,

    /// Backend base URL.
    pub api_host: String,

    /// Model name.
    pub model: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "pipewrench=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            captures_dir: PathBuf::from("captures"),
            capture: CaptureDefaults::default(),
            broker: BrokerConfig::default(),
            agent: AgentConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            format: "png".to_string(),
            jpeg_quality: 90,
            delay_seconds: 0,
            poll_interval_ms: 100,
            refresh_interval_secs: 3,
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            topic: "sauron".to_string(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            backend_type: "ollama".to_string(),
            api_key: String::new(),
            api_host: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("pipewrench").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_settings() {
        let config = AppConfig::default();
        assert_eq!(config.broker.host, "localhost");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.topic, "sauron");
        assert_eq!(config.capture.format, "png");
        assert_eq!(config.capture.jpeg_quality, 90);
        assert_eq!(config.capture.poll_interval_ms, 100);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.captures_dir, config.captures_dir);
        assert_eq!(back.agent.backend_type, config.agent.backend_type);
        assert_eq!(back.logging.level, config.logging.level);
    }
}
