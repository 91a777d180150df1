//! Configuration management CLI commands.
//!
//! `config get`, `config set`, `config list` and `config path` read and edit
//! the INI file without starting a session.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Subcommand;
use trackside::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one configuration value
    Get {
        /// Key in section.key form (e.g., feed.url)
        key: String,
    },

    /// Validate and store a configuration value
    Set {
        /// Key in section.key form (e.g., render.tick_ms)
        key: String,

        /// New value; an empty string clears optional keys
        value: String,
    },

    /// List every key with its current value
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand against the user config file, or `file` if given.
pub fn run(command: ConfigCommands, file: Option<PathBuf>) -> Result<(), CliError> {
    let path = file.unwrap_or_else(config_file_path);
    let mut stdout = io::stdout().lock();
    execute(command, &path, &mut stdout)
}

fn execute(command: ConfigCommands, path: &Path, out: &mut impl Write) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => {
            let key = parse_key(&key)?;
            let config = ConfigFile::load_from(path)?;
            writeln!(out, "{}", display_value(&key.get(&config)))?;
        }
        ConfigCommands::Set { key, value } => {
            let key = parse_key(&key)?;
            let mut config = ConfigFile::load_from(path)?;
            key.set(&mut config, &value)?;
            config.save_to(path)?;
            writeln!(out, "Set {} = {}", key, display_value(&key.get(&config)))?;
        }
        ConfigCommands::List => list(&ConfigFile::load_from(path)?, out)?,
        ConfigCommands::Path => writeln!(out, "{}", path.display())?,
    }
    Ok(())
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Run 'trackside config list' for the available keys.",
            key
        ))
    })
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

/// Print keys grouped by section, in file order.
fn list(config: &ConfigFile, out: &mut impl Write) -> io::Result<()> {
    let mut section = "";
    for key in ConfigKey::all() {
        if key.section() != section {
            if !section.is_empty() {
                writeln!(out)?;
            }
            section = key.section();
            writeln!(out, "[{}]", section)?;
        }
        writeln!(out, "  {} = {}", key.key_name(), display_value(&key.get(config)))?;
    }
    Ok(())
}
