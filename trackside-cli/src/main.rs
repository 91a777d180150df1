//! Trackside CLI - live race feed and track map tooling.
//!
//! ```text
//! trackside watch --url ws://localhost:8765 --circuit monaco --compare VER HAM
//! trackside track --circuit suzuka --svg suzuka.svg --at 0 --at 50
//! trackside config set render.tick_ms 250
//! ```

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::common::ProjectionKind;
use commands::config::ConfigCommands;
use commands::track::TrackArgs;
use commands::watch::WatchArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "trackside", version, about = "Live race telemetry and track maps")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Connect to a race feed and print the leaderboard every tick
    Watch {
        /// Feed WebSocket URL (overrides feed.url)
        #[arg(long)]
        url: Option<String>,

        /// Circuit name used for lap lengths (overrides track.circuit)
        #[arg(long)]
        circuit: Option<String>,

        /// Render tick in milliseconds (overrides render.tick_ms)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Drivers shown in the lap progress line (overrides render.top_n)
        #[arg(long)]
        top: Option<usize>,

        /// Exit when the feed closes instead of reconnecting
        #[arg(long)]
        no_reconnect: bool,

        /// Compare the speed traces of two drivers
        #[arg(long, num_args = 2, value_names = ["A", "B"])]
        compare: Option<Vec<String>>,
    },

    /// Load a circuit outline and print its projected geometry
    Track {
        /// Circuit name or outline id (overrides track.circuit)
        #[arg(long)]
        circuit: Option<String>,

        /// Directory URL of the outlines (overrides track.geometry_base_url)
        #[arg(long)]
        base_url: Option<String>,

        /// Map projection
        #[arg(long, value_enum, default_value_t = ProjectionKind::Mercator)]
        projection: ProjectionKind,

        /// Write the track as an SVG file
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Lap percentage to resolve to a point; repeatable
        #[arg(long = "at", value_name = "SCALAR")]
        at: Vec<f64>,
    },

    /// View or edit configuration
    Config {
        /// Config file to use instead of the default location
        #[arg(long, global = true)]
        file: Option<PathBuf>,

        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Watch {
            url,
            circuit,
            tick_ms,
            top,
            no_reconnect,
            compare,
        } => commands::watch::run(
            WatchArgs {
                url,
                circuit,
                tick_ms,
                top,
                no_reconnect,
                compare: compare.and_then(|pair| match pair.as_slice() {
                    [a, b] => Some((a.clone(), b.clone())),
                    _ => None,
                }),
            },
            cli.verbose,
        ),
        Commands::Track {
            circuit,
            base_url,
            projection,
            svg,
            at,
        } => commands::track::run(
            TrackArgs {
                circuit,
                base_url,
                projection,
                svg,
                at,
            },
            cli.verbose,
        ),
        Commands::Config { file, command } => commands::config::run(command, file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from([
            "trackside",
            "watch",
            "--url",
            "ws://race.local:9000",
            "--tick-ms",
            "250",
            "--top",
            "3",
            "--compare",
            "VER",
            "HAM",
        ])
        .unwrap();
        match cli.command {
            Commands::Watch {
                url,
                tick_ms,
                top,
                compare,
                ..
            } => {
                assert_eq!(url.as_deref(), Some("ws://race.local:9000"));
                assert_eq!(tick_ms, Some(250));
                assert_eq!(top, Some(3));
                assert_eq!(compare, Some(vec!["VER".to_string(), "HAM".to_string()]));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_compare_needs_two_drivers() {
        assert!(Cli::try_parse_from(["trackside", "watch", "--compare", "VER"]).is_err());
    }

    #[test]
    fn test_parse_track_repeated_scalars() {
        let cli = Cli::try_parse_from([
            "trackside",
            "-v",
            "track",
            "--circuit",
            "suzuka",
            "--at",
            "0",
            "--at",
            "50.5",
            "--projection",
            "equirectangular",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Track {
                circuit,
                at,
                projection,
                ..
            } => {
                assert_eq!(circuit.as_deref(), Some("suzuka"));
                assert_eq!(at, vec![0.0, 50.5]);
                assert_eq!(projection, ProjectionKind::Equirectangular);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_set() {
        let cli =
            Cli::try_parse_from(["trackside", "config", "set", "feed.reconnect", "false"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Set { .. },
                file: None,
            }
        ));
    }
}
