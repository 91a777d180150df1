//! Dotted configuration keys (`section.key`) with typed get/set.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use super::file::{ConfigError, ConfigFile};

/// Every settable key in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    FeedUrl,
    FeedReconnect,
    FeedReconnectDelaySecs,
    TrackCircuit,
    TrackGeometryBaseUrl,
    TrackCanvasSize,
    TrackPadding,
    TrackFetchTimeoutSecs,
    MetricsWindowSecs,
    RenderTickMs,
    RenderTopN,
    LoggingLevel,
    LoggingFile,
}

const ALL_KEYS: [ConfigKey; 13] = [
    ConfigKey::FeedUrl,
    ConfigKey::FeedReconnect,
    ConfigKey::FeedReconnectDelaySecs,
    ConfigKey::TrackCircuit,
    ConfigKey::TrackGeometryBaseUrl,
    ConfigKey::TrackCanvasSize,
    ConfigKey::TrackPadding,
    ConfigKey::TrackFetchTimeoutSecs,
    ConfigKey::MetricsWindowSecs,
    ConfigKey::RenderTickMs,
    ConfigKey::RenderTopN,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingFile,
];

impl ConfigKey {
    /// All keys, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    /// Dotted name, e.g. `feed.url`.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::FeedUrl => "feed.url",
            ConfigKey::FeedReconnect => "feed.reconnect",
            ConfigKey::FeedReconnectDelaySecs => "feed.reconnect_delay_secs",
            ConfigKey::TrackCircuit => "track.circuit",
            ConfigKey::TrackGeometryBaseUrl => "track.geometry_base_url",
            ConfigKey::TrackCanvasSize => "track.canvas_size",
            ConfigKey::TrackPadding => "track.padding",
            ConfigKey::TrackFetchTimeoutSecs => "track.fetch_timeout_secs",
            ConfigKey::MetricsWindowSecs => "metrics.window_secs",
            ConfigKey::RenderTickMs => "render.tick_ms",
            ConfigKey::RenderTopN => "render.top_n",
            ConfigKey::LoggingLevel => "logging.level",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    /// INI section name.
    pub fn section(&self) -> &'static str {
        self.split().0
    }

    /// Key name within the section.
    pub fn key_name(&self) -> &'static str {
        self.split().1
    }

    fn split(&self) -> (&'static str, &'static str) {
        let name = self.name();
        name.split_once('.').unwrap_or((name, ""))
    }

    /// Current value as a string. Unset optional values are empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::FeedUrl => config.feed.url.clone(),
            ConfigKey::FeedReconnect => config.feed.reconnect.to_string(),
            ConfigKey::FeedReconnectDelaySecs => config.feed.reconnect_delay_secs.to_string(),
            ConfigKey::TrackCircuit => config.track.circuit.clone(),
            ConfigKey::TrackGeometryBaseUrl => config.track.geometry_base_url.clone(),
            ConfigKey::TrackCanvasSize => config.track.canvas_size.to_string(),
            ConfigKey::TrackPadding => config.track.padding.to_string(),
            ConfigKey::TrackFetchTimeoutSecs => config.track.fetch_timeout_secs.to_string(),
            ConfigKey::MetricsWindowSecs => config.metrics.window_secs.to_string(),
            ConfigKey::RenderTickMs => config.render.tick_ms.to_string(),
            ConfigKey::RenderTopN => config.render.top_n.to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Validate `value` and store it.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::FeedUrl => {
                if !(value.starts_with("ws://") || value.starts_with("wss://")) {
                    return Err(self.invalid(value, "expected a ws:// or wss:// URL"));
                }
                config.feed.url = value.to_string();
            }
            ConfigKey::FeedReconnect => config.feed.reconnect = self.parse_bool(value)?,
            ConfigKey::FeedReconnectDelaySecs => {
                config.feed.reconnect_delay_secs = self.parse_number(value)?
            }
            ConfigKey::TrackCircuit => {
                if value.is_empty() {
                    return Err(self.invalid(value, "circuit name cannot be empty"));
                }
                config.track.circuit = value.to_string();
            }
            ConfigKey::TrackGeometryBaseUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(self.invalid(value, "expected an http:// or https:// URL"));
                }
                config.track.geometry_base_url = value.trim_end_matches('/').to_string();
            }
            ConfigKey::TrackCanvasSize => {
                let size: f64 = self.parse_number(value)?;
                if !size.is_finite() || size <= 0.0 {
                    return Err(self.invalid(value, "must be a positive number"));
                }
                config.track.canvas_size = size;
            }
            ConfigKey::TrackPadding => {
                let padding: f64 = self.parse_number(value)?;
                if !padding.is_finite() || padding < 0.0 {
                    return Err(self.invalid(value, "must be zero or more"));
                }
                config.track.padding = padding;
            }
            ConfigKey::TrackFetchTimeoutSecs => {
                config.track.fetch_timeout_secs = self.parse_positive(value)?
            }
            ConfigKey::MetricsWindowSecs => {
                let window: f64 = self.parse_number(value)?;
                let fits = Duration::try_from_secs_f64(window).is_ok_and(|d| !d.is_zero());
                if !fits || window <= 0.0 {
                    return Err(self.invalid(value, "must be a positive number of seconds"));
                }
                config.metrics.window_secs = window;
            }
            ConfigKey::RenderTickMs => config.render.tick_ms = self.parse_positive(value)?,
            ConfigKey::RenderTopN => {
                config.render.top_n = self.parse_positive(value)? as usize
            }
            ConfigKey::LoggingLevel => {
                EnvFilter::try_new(value).map_err(|e| self.invalid(value, &e.to_string()))?;
                config.logging.level = value.to_string();
            }
            ConfigKey::LoggingFile => {
                config.logging.file = (!value.is_empty()).then(|| PathBuf::from(value));
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name().to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn parse_bool(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(self.invalid(value, "expected true or false")),
        }
    }

    fn parse_number<N: FromStr>(&self, value: &str) -> Result<N, ConfigError>
    where
        N::Err: fmt::Display,
    {
        value
            .parse::<N>()
            .map_err(|e| self.invalid(value, &e.to_string()))
    }

    fn parse_positive(&self, value: &str) -> Result<u64, ConfigError> {
        let n: u64 = self.parse_number(value)?;
        if n == 0 {
            return Err(self.invalid(value, "must be at least 1"));
        }
        Ok(n)
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
