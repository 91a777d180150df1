//! INI configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::{debug, warn};

use crate::circuit::DEFAULT_GEOMETRY_BASE_URL;
use crate::feed::{FeedConfig, DEFAULT_FEED_URL};
use crate::geometry::{BuildOptions, Canvas, ProjectorConfig, DEFAULT_CANVAS_SIZE, DEFAULT_PADDING};
use crate::logging::{LoggingConfig, DEFAULT_LOG_LEVEL};
use crate::metrics::{MetricsConfig, DEFAULT_WINDOW};
use crate::session::SessionConfig;
use crate::views::DEFAULT_TOP_N;

use super::keys::ConfigKey;

/// Directory name under the platform config directory.
pub const CONFIG_DIR_NAME: &str = "trackside";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors reading, writing or editing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, String),

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// `[feed]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSettings {
    pub url: String,
    pub reconnect: bool,
    pub reconnect_delay_secs: u64,
}

/// `[track]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSettings {
    pub circuit: String,
    pub geometry_base_url: String,
    pub canvas_size: f64,
    pub padding: f64,
    pub fetch_timeout_secs: u64,
}

/// `[metrics]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSettings {
    pub window_secs: f64,
}

/// `[render]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub tick_ms: u64,
    pub top_n: usize,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

/// All user settings. Every key has a default.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub feed: FeedSettings,
    pub track: TrackSettings,
    pub metrics: MetricsSettings,
    pub render: RenderSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            feed: FeedSettings {
                url: DEFAULT_FEED_URL.to_string(),
                reconnect: true,
                reconnect_delay_secs: 5,
            },
            track: TrackSettings {
                circuit: "monaco".to_string(),
                geometry_base_url: DEFAULT_GEOMETRY_BASE_URL.to_string(),
                canvas_size: DEFAULT_CANVAS_SIZE,
                padding: DEFAULT_PADDING,
                fetch_timeout_secs: 15,
            },
            metrics: MetricsSettings { window_secs: 4.0 },
            render: RenderSettings {
                tick_ms: 100,
                top_n: DEFAULT_TOP_N,
            },
            logging: LoggingSettings {
                level: DEFAULT_LOG_LEVEL.to_string(),
                file: None,
            },
        }
    }
}

/// Location of the user config file: `<config dir>/trackside/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

impl ConfigFile {
    /// Load from [`config_file_path`]. A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(config);
        }

        let ini = Ini::load_from_file(path)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;

        for (section, properties) in ini.iter() {
            let Some(section) = section else {
                continue;
            };
            for (key, value) in properties.iter() {
                let name = format!("{section}.{key}");
                match name.parse::<ConfigKey>() {
                    Ok(config_key) => config_key.set(&mut config, value)?,
                    Err(_) => warn!(key = %name, "Ignoring unknown config key"),
                }
            }
        }

        Ok(config)
    }

    /// Save to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories. Unset keys are omitted.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::Io(parent.to_path_buf(), e))?;
            }
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        ini.write_to_file(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig::new(self.feed.url.clone())
            .with_reconnect(self.feed.reconnect)
            .with_reconnect_delay(Duration::from_secs(self.feed.reconnect_delay_secs))
    }

    pub fn projector_config(&self) -> ProjectorConfig {
        ProjectorConfig {
            geometry_base_url: self.track.geometry_base_url.clone(),
            build: BuildOptions {
                canvas: Canvas::square(self.track.canvas_size),
                padding: self.track.padding,
            },
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.track.fetch_timeout_secs)
    }

    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            window: Duration::try_from_secs_f64(self.metrics.window_secs)
                .ok()
                .filter(|w| !w.is_zero())
                .unwrap_or(DEFAULT_WINDOW),
            ..Default::default()
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            feed: self.feed_config(),
            circuit: Some(self.track.circuit.clone()),
            tick: Duration::from_millis(self.render.tick_ms),
            top_n: self.render.top_n,
            metrics: self.metrics_config(),
            compare: None,
        }
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.logging.level.clone(),
            file: self.logging.file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.feed.url, "ws://localhost:8765");
        assert!(config.feed.reconnect);
        assert_eq!(config.track.circuit, "monaco");
        assert_eq!(config.track.canvas_size, 1000.0);
        assert_eq!(config.render.top_n, 5);
        assert_eq!(config.logging.file, None);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.feed.url = "wss://race.example:9000/feed".to_string();
        config.feed.reconnect = false;
        config.track.circuit = "suzuka".to_string();
        config.render.tick_ms = 250;
        config.logging.file = Some(PathBuf::from("/tmp/trackside.log"));
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[render]\ntop_n = 8\n\n[extra]\nfoo = bar\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.render.top_n, 8);
        assert_eq!(config.render.tick_ms, 100);
        assert_eq!(config.feed, ConfigFile::default().feed);
    }

    #[test]
    fn test_invalid_value_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[feed]\nurl = http://not-a-socket\n").unwrap();

        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_oversized_metrics_window_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[metrics]\nwindow_secs = 1e300\n").unwrap();

        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut config = ConfigFile::default();
        config.metrics.window_secs = 1e300;
        assert_eq!(config.metrics_config().window, DEFAULT_WINDOW);
    }

    #[test]
    fn test_conversions() {
        let mut config = ConfigFile::default();
        config.feed.reconnect_delay_secs = 2;
        config.metrics.window_secs = 6.0;
        config.track.circuit = "spa".to_string();

        assert_eq!(config.feed_config().reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.metrics_config().window, Duration::from_secs(6));
        assert_eq!(config.projector_config().build.canvas, Canvas::square(1000.0));

        let session = config.session_config();
        assert_eq!(session.circuit.as_deref(), Some("spa"));
        assert_eq!(session.tick, Duration::from_millis(100));
        assert_eq!(config.logging_config().level, "info");
    }

    #[test]
    fn test_config_file_path_location() {
        let path = config_file_path();
        assert!(path.ends_with("trackside/config.ini"));
    }
}
