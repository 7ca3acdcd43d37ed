//! Link configuration
//!
//! One JSON file holds the transport, engine and driver settings. Every
//! field has a default, so a partial file (or none at all) is fine.
//!
//! ```json
//! {
//!   "transport": { "port": "/dev/ttyACM0", "flow_control": true },
//!   "weather": { "api_key": "..." }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::drivers::{HttpSettings, MqttSettings, SocketSettings, WeatherSettings};
use crate::protocol::{EngineSettings, TransportConfig};

/// Application directory under the platform config dir
pub const CONFIG_DIR_NAME: &str = "ryzlink";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Errors reading or writing the config file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("Failed to access {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid config JSON
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// The config could not be turned into JSON
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The platform has no config directory
    #[error("No configuration directory on this platform")]
    NoConfigDir,
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial link
    pub transport: TransportConfig,
    /// Transaction engine
    pub engine: EngineSettings,
    /// HTTP exerciser
    pub http: HttpSettings,
    /// Weather lookup
    pub weather: WeatherSettings,
    /// MQTT client
    pub mqtt: MqttSettings,
    /// TCP echo client
    pub socket: SocketSettings,
}

impl LinkConfig {
    /// `<config dir>/ryzlink/config.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` when it exists, otherwise use the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            Self::load(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Write to `path`, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = LinkConfig::load_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, LinkConfig::default());
        assert_eq!(config.transport.baud_rate, 115200);
        assert_eq!(config.socket.timeout_ms, 10_000);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"transport": {"port": "/dev/ttyACM0"}, "engine": {"notifications": ["+CEREG", "+SQNSMQTTONDISCONNECT"]}}"#,
        )
        .unwrap();

        let config = LinkConfig::load(&path).unwrap();
        assert_eq!(config.transport.port, "/dev/ttyACM0");
        assert_eq!(config.transport.baud_rate, 115200);
        assert_eq!(config.engine.notifications.prefixes().len(), 2);
        assert_eq!(config.engine.error_marker, "ERROR");
        assert_eq!(config.mqtt.broker, "test.mosquitto.org");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = LinkConfig::default();
        config.weather.api_key = "secret".to_string();
        config.transport.flow_control = true;

        config.save(&path).unwrap();
        assert_eq!(LinkConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            LinkConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
