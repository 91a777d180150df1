//! Shared setup for long-running commands.
//!
//! Loads the config file, installs logging, builds the Tokio runtime and
//! wires Ctrl-C to a [`CancellationToken`].

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;
use trackside::config::{config_file_path, ConfigFile};
use trackside::logging::{init_logging, LoggingGuard};

use crate::error::CliError;

/// Holds the loaded config and the logging guard for a command's lifetime.
pub struct CliRunner {
    config: ConfigFile,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Load config and start logging. `verbose` forces debug level.
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let mut logging = config.logging_config();
        if verbose {
            logging.level = "debug".to_string();
        }
        let guard = init_logging(&logging)?;

        Ok(Self {
            config,
            _logging: guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = trackside::VERSION,
            config = %config_file_path().display(),
            "Trackside starting"
        );
    }

    /// Multi-threaded runtime for the command.
    pub fn runtime(&self) -> Result<Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("trackside")
            .build()
            .map_err(|e| CliError::Runtime(format!("Failed to start runtime: {}", e)))
    }

    /// Token cancelled on the first Ctrl-C.
    pub fn shutdown_token(&self) -> Result<CancellationToken, CliError> {
        let token = CancellationToken::new();
        let handler_token = token.clone();

        ctrlc::set_handler(move || {
            if !handler_token.is_cancelled() {
                println!();
                println!("Received shutdown signal, stopping...");
                handler_token.cancel();
            }
        })
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

        Ok(token)
    }
}
