//! CLI error type.

use thiserror::Error;
use trackside::config::ConfigError;
use trackside::feed::FeedError;
use trackside::geometry::GeometryError;
use trackside::logging::LoggingError;

/// Errors that end a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Track geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::ConfigFile(_) => 2,
            _ => 1,
        }
    }

    /// Print the error and exit the process.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);
        std::process::exit(self.exit_code())
    }
}
