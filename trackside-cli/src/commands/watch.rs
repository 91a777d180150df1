//! Watch command - follow a live race feed in the terminal.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use trackside::session::{Coalescer, RaceSession, RaceSnapshot, SessionConfig};
use trackside::views::DEFAULT_PREDICTION_ROWS;

use super::common::{format_race_time, or_dash};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the watch command.
#[derive(Debug, Default)]
pub struct WatchArgs {
    pub url: Option<String>,
    pub circuit: Option<String>,
    pub tick_ms: Option<u64>,
    pub top: Option<usize>,
    pub no_reconnect: bool,
    pub compare: Option<(String, String)>,
}

impl WatchArgs {
    /// Apply command-line overrides on top of the configured session.
    pub fn apply(&self, config: &mut SessionConfig) -> Result<(), CliError> {
        if let Some(url) = &self.url {
            config.feed.url = url.clone();
        }
        if let Some(circuit) = &self.circuit {
            config.circuit = Some(circuit.clone());
        }
        if let Some(tick_ms) = self.tick_ms {
            if tick_ms == 0 {
                return Err(CliError::Config("--tick-ms must be at least 1".to_string()));
            }
            config.tick = Duration::from_millis(tick_ms);
        }
        if let Some(top) = self.top {
            config.top_n = top;
        }
        if self.no_reconnect {
            config.feed.reconnect = false;
        }
        if let Some((a, b)) = &self.compare {
            if a == b {
                return Err(CliError::Config(
                    "--compare needs two different drivers".to_string(),
                ));
            }
            config.compare = Some((a.to_ascii_uppercase(), b.to_ascii_uppercase()));
        }
        Ok(())
    }
}

/// Run the watch command.
pub fn run(args: WatchArgs, verbose: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(verbose)?;
    runner.log_startup("watch");

    let mut config = runner.config().session_config();
    args.apply(&mut config)?;

    println!("Trackside v{}", trackside::VERSION);
    println!("===============");
    println!();
    println!("Feed:    {}", config.feed.url);
    println!("Circuit: {}", or_dash(config.circuit.as_deref()));
    println!("Tick:    {} ms", config.tick.as_millis());
    if let Some((a, b)) = &config.compare {
        println!("Compare: {} vs {}", a, b);
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let runtime = runner.runtime()?;
    let cancel = runner.shutdown_token()?;
    runtime.block_on(watch(config, cancel))
}

async fn watch(config: SessionConfig, cancel: CancellationToken) -> Result<(), CliError> {
    let tick = config.tick;
    let top_n = config.top_n;

    let mut session = RaceSession::create(config);
    session.connect()?;

    let printer = tokio::spawn(print_ticks(session.renders(), tick, top_n, cancel.clone()));

    session.run(cancel.clone()).await;
    cancel.cancel();

    let final_snapshot = session.snapshot();
    session.dispose().await;
    printer
        .await
        .map_err(|e| CliError::Runtime(format!("Render task failed: {}", e)))?;

    println!();
    println!("Session Summary");
    println!("───────────────");
    println!("  Snapshots:  {}", final_snapshot.sequence);
    println!("  Drivers:    {}", final_snapshot.state.len());
    if let Some(error) = final_snapshot.error() {
        println!("  Last error: {}", error);
    }
    Ok(())
}

/// Print at most one snapshot per tick until cancelled.
async fn print_ticks(
    renders: Arc<Coalescer<RaceSnapshot>>,
    tick: Duration,
    top_n: usize,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        if let Some(snapshot) = renders.take() {
            print!("{}", format_snapshot(&snapshot, top_n));
        }
    }

    debug!(
        published = renders.published(),
        delivered = renders.delivered(),
        "Render loop stopped"
    );
}

/// Render a snapshot as a text block.
pub fn format_snapshot(snapshot: &RaceSnapshot, top_n: usize) -> String {
    let mut out = String::new();

    let circuit = match (snapshot.circuit.as_deref(), snapshot.lap_length_km()) {
        (Some(name), Some(km)) => format!("{} ({:.2} km)", name, km),
        _ => "-".to_string(),
    };
    let _ = writeln!(
        out,
        "[#{} {}] circuit {}",
        snapshot.sequence, snapshot.connection, circuit
    );
    if let Some(error) = snapshot.error() {
        let _ = writeln!(out, "  ! {}", error);
    }

    let rows = snapshot.leaderboard();
    if !rows.is_empty() {
        let _ = writeln!(
            out,
            "  {:>3}  {:<4} {:>4} {:>9} {:>7} {:>4} {:>4} {:>4}",
            "P", "CODE", "LAP", "KM", "KM/H", "THR", "BRK", "CRN"
        );
        for row in &rows {
            let reading = snapshot.reading(&row.code);
            let _ = writeln!(
                out,
                "  {:>3}  {:<4} {:>4} {:>9.3} {:>7} {:>4} {:>4} {:>4}",
                row.position,
                row.code,
                or_dash(row.lap),
                row.km,
                or_dash(row.speed_kmh.map(|s| format!("{:.1}", s))),
                or_dash(reading.map(|r| format!("{}%", r.throttle))),
                or_dash(reading.map(|r| format!("{}%", r.braking))),
                or_dash(reading.map(|r| format!("{}%", r.cornering))),
            );
        }
    }

    let top = snapshot.top_n(top_n);
    if !top.is_empty() {
        let cars: Vec<String> = top
            .iter()
            .map(|car| format!("{} {:.1}%", car.code, car.scalar))
            .collect();
        let _ = writeln!(out, "  Lap progress: {}", cars.join("  "));
    }

    if let Some(point) = &snapshot.comparison {
        let _ = writeln!(
            out,
            "  Compare {}: {:.0} vs {:.0} km/h, gap {:+.2}s",
            point.label, point.speed1, point.speed2, point.delta_secs
        );
    }

    let predictions = snapshot.predictions(DEFAULT_PREDICTION_ROWS);
    if !predictions.is_empty() {
        let cars: Vec<String> = predictions
            .iter()
            .map(|p| format!("{}. {} {}", p.rank, p.driver, format_race_time(p.predicted_seconds)))
            .collect();
        let _ = writeln!(out, "  Predicted: {}", cars.join("  "));
        if let Some(mae) = snapshot.state.prediction_mae() {
            let _ = writeln!(out, "  Prediction MAE: {:.2}s", mae);
        }
    }

    out
}
