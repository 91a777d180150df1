//! Track command - load a circuit outline and inspect its projection.

use std::fmt::Write as _;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use trackside::circuit::{self, geometry_url, resolve_locator};
use trackside::geometry::{
    GeometryError, HttpGeometrySource, ProjectorConfig, TrackGeometry, TrackProjector,
};
use trackside::views::HslColor;

use super::common::ProjectionKind;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the track command.
#[derive(Debug, Default)]
pub struct TrackArgs {
    pub circuit: Option<String>,
    pub base_url: Option<String>,
    pub projection: ProjectionKind,
    pub svg: Option<PathBuf>,
    pub at: Vec<f64>,
}

/// Run the track command.
pub fn run(args: TrackArgs, verbose: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(verbose)?;
    runner.log_startup("track");
    let config = runner.config();

    let circuit = args
        .circuit
        .clone()
        .unwrap_or_else(|| config.track.circuit.clone());
    let mut projector_config = config.projector_config();
    if let Some(base_url) = &args.base_url {
        projector_config.geometry_base_url = base_url.trim_end_matches('/').to_string();
    }

    println!(
        "Loading {} ({})",
        circuit,
        geometry_url(&projector_config.geometry_base_url, &circuit)
    );

    let source = HttpGeometrySource::with_timeout(config.fetch_timeout())?;
    let runtime = runner.runtime()?;
    let cancel = runner.shutdown_token()?;
    let geometry = runtime.block_on(load(
        source,
        projector_config,
        args.projection,
        &circuit,
        cancel,
    ))?;

    print!("{}", describe(&geometry, &args.at));

    if let Some(path) = &args.svg {
        std::fs::write(path, render_svg(&geometry))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

async fn load(
    source: HttpGeometrySource,
    config: ProjectorConfig,
    projection: ProjectionKind,
    circuit: &str,
    cancel: CancellationToken,
) -> Result<TrackGeometry, CliError> {
    let projector = TrackProjector::with_projection(source, config, projection.strategy());
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            projector.shutdown();
            Err(GeometryError::Superseded)
        }
        result = projector.load(circuit) => result,
    };
    Ok(result?.as_ref().clone())
}

/// Text summary of a loaded track, with points for each requested scalar.
pub fn describe(geometry: &TrackGeometry, scalars: &[f64]) -> String {
    let mut out = String::new();
    let bounds = &geometry.bounds;

    let _ = writeln!(out, "Track:        {}", geometry.track);
    let _ = writeln!(out, "Locator:      {}", resolve_locator(&geometry.track));
    if let Some(km) = circuit::known_lap_length_km(&geometry.track) {
        let _ = writeln!(out, "Lap length:   {:.2} km", km);
    }
    let _ = writeln!(out, "Paths:        {}", geometry.paths.len());
    let _ = writeln!(
        out,
        "Bounds:       ({:.1}, {:.1}) - ({:.1}, {:.1})",
        bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y
    );
    let _ = writeln!(out, "View box:     {}", geometry.view_box());
    let _ = writeln!(out, "Path length:  {:.1}", geometry.total_path_length);

    for &scalar in scalars {
        match geometry.point_at_scalar(scalar) {
            Some(p) => {
                let _ = writeln!(out, "  {:>6.2}% -> ({:.1}, {:.1})", scalar, p.x, p.y);
            }
            None => {
                let _ = writeln!(out, "  {:>6.2}% -> (no path)", scalar);
            }
        }
    }
    out
}

/// Standalone SVG of the track, primary path highlighted.
pub fn render_svg(geometry: &TrackGeometry) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{}">"#,
        geometry.view_box()
    );
    let primary = geometry.primary_index();
    for (i, path) in geometry.paths.iter().enumerate() {
        let (stroke, width) = if Some(i) == primary {
            (HslColor::WHITE.to_string(), 6)
        } else {
            ("#888".to_string(), 3)
        };
        let _ = writeln!(
            out,
            r#"  <path d="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            path.to_svg_path(),
            stroke,
            width
        );
    }
    out.push_str("</svg>\n");
    out
}
