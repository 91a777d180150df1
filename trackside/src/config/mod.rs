//! User configuration.
//!
//! Settings live in an INI file at `~/.config/trackside/config.ini` (or the
//! platform equivalent). Every key has a default, so a missing file is valid.
//!
//! ```ini
//! [feed]
//! url = ws://localhost:8765
//! reconnect = true
//!
//! [track]
//! circuit = monaco
//!
//! [render]
//! tick_ms = 100
//! top_n = 5
//! ```
//!
//! [`ConfigKey`] addresses individual settings by dotted name for the
//! `config get/set` commands.

mod file;
mod keys;

pub use file::{
    config_file_path, ConfigError, ConfigFile, FeedSettings, LoggingSettings, MetricsSettings,
    RenderSettings, TrackSettings, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
};
pub use keys::ConfigKey;
