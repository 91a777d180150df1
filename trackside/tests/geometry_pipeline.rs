//! Integration tests for the track geometry pipeline.
//!
//! Serves GeoJSON documents from memory and runs them through
//! `TrackProjector`, then places live cars from a `RaceSession` on the result.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use trackside::circuit::geometry_url;
use trackside::geometry::{
    place_markers, GeometryError, GeometrySource, Highlight, ProjectorConfig, ProjectorState,
    TrackProjector,
};
use trackside::session::{RaceSession, SessionConfig};
use trackside::views::HslColor;

const BASE: &str = "http://tracks.test";

/// Serves fixed documents, optionally after a delay.
#[derive(Default)]
struct StaticSource {
    documents: HashMap<String, (Duration, Vec<u8>)>,
}

impl StaticSource {
    fn serve(mut self, circuit: &str, body: &str) -> Self {
        self.documents.insert(
            geometry_url(BASE, circuit),
            (Duration::ZERO, body.as_bytes().to_vec()),
        );
        self
    }

    fn serve_slowly(mut self, circuit: &str, body: &str, delay: Duration) -> Self {
        self.documents
            .insert(geometry_url(BASE, circuit), (delay, body.as_bytes().to_vec()));
        self
    }
}

#[allow(clippy::manual_async_fn)]
impl GeometrySource for StaticSource {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, GeometryError>> + Send {
        let entry = self.documents.get(url).cloned();
        let url = url.to_string();
        async move {
            match entry {
                Some((delay, body)) => {
                    tokio::time::sleep(delay).await;
                    Ok(body)
                }
                None => Err(GeometryError::Fetch(format!("HTTP 404 Not Found from {url}"))),
            }
        }
    }
}

fn projector(source: StaticSource) -> TrackProjector<StaticSource> {
    TrackProjector::new(
        source,
        ProjectorConfig {
            geometry_base_url: BASE.to_string(),
            ..Default::default()
        },
    )
}

const MULTI_LINE: &str = r#"{
    "type": "FeatureCollection",
    "features": [{
        "type": "Feature",
        "properties": {"name": "Circuit de Monaco"},
        "geometry": {
            "type": "MultiLineString",
            "coordinates": [
                [[7.420, 43.734], [7.425, 43.737], [7.428, 43.740]],
                [[7.428, 43.740], [7.430, 43.738]],
                [[7.430, 43.738], [7.421, 43.733], [7.420, 43.734]]
            ]
        }
    }]
}"#;

const SIMPLE_LINE: &str = r#"{
    "type": "Feature",
    "geometry": {"type": "LineString", "coordinates": [[136.53, 34.84], [136.54, 34.85], [136.55, 34.84]]}
}"#;

#[tokio::test]
async fn test_multi_line_string_gives_one_path_per_part() {
    let projector = projector(StaticSource::default().serve("monaco", MULTI_LINE));

    let geometry = projector.load("monaco").await.unwrap();
    assert_eq!(geometry.paths.len(), 3);
    assert_eq!(geometry.track, "monaco");
    assert!(geometry.total_path_length > 0.0);
    assert_eq!(geometry.total_path_length, geometry.paths[0].length());

    let vb = geometry.view_box();
    assert!(vb.width >= 1.0 && vb.height >= 1.0);
    assert_eq!(projector.state(), ProjectorState::Ready(geometry));
}

#[tokio::test]
async fn test_scalar_endpoints_follow_primary_path() {
    let projector = projector(StaticSource::default().serve("suzuka", SIMPLE_LINE));
    let geometry = projector.load("suzuka").await.unwrap();

    let primary = geometry.primary().unwrap();
    let start = geometry.point_at_scalar(0.0).unwrap();
    let end = geometry.point_at_scalar(100.0).unwrap();
    assert_eq!(Some(start), primary.start());
    assert_eq!(Some(end), primary.point_at_length(primary.length()));
    assert_eq!(geometry.point_at_scalar(250.0), Some(end));
}

#[tokio::test]
async fn test_failures_leave_failed_state() {
    let projector = projector(
        StaticSource::default()
            .serve("spa", "<html>not geojson</html>")
            .serve("monza", r#"{"type":"Point","coordinates":[9.28,45.62]}"#)
            .serve("lusail", r#"{"type":"Topology","objects":{}}"#),
    );

    let cases = [
        ("silverstone", "fetch"),
        ("spa", "parse"),
        ("monza", "drawable"),
        ("lusail", "unsupported"),
    ];
    for (track, expected) in cases {
        let error = projector.load(track).await.unwrap_err();
        let matched = match expected {
            "fetch" => matches!(error, GeometryError::Fetch(_)),
            "parse" => matches!(error, GeometryError::Parse(_)),
            "drawable" => matches!(error, GeometryError::NoDrawablePath),
            _ => matches!(error, GeometryError::UnsupportedGeometry(_)),
        };
        assert!(matched, "{track}: unexpected {error:?}");

        match projector.state() {
            ProjectorState::Failed { track: failed, .. } => assert_eq!(failed, track),
            other => panic!("{track}: expected failed state, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_newer_selection_wins_over_slow_older_one() {
    let projector = projector(
        StaticSource::default()
            .serve_slowly("monaco", MULTI_LINE, Duration::from_millis(300))
            .serve("suzuka", SIMPLE_LINE),
    );
    let slow = projector.select_track("monaco");
    let fast = projector.load("suzuka").await.unwrap();
    slow.await.unwrap();

    assert_eq!(fast.track, "suzuka");
    assert_eq!(projector.generation(), 2);
    match projector.state() {
        ProjectorState::Ready(geometry) => assert_eq!(geometry.track, "suzuka"),
        other => panic!("expected suzuka to stay ready, got {other:?}"),
    }
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_load() {
    let projector = projector(StaticSource::default().serve_slowly(
        "monaco",
        MULTI_LINE,
        Duration::from_secs(10),
    ));

    let pending = {
        let projector = projector.clone();
        tokio::spawn(async move { projector.load("monaco").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    projector.shutdown();

    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("shutdown should cancel the load")
        .unwrap();
    assert_eq!(result.unwrap_err(), GeometryError::Superseded);
    assert_eq!(
        projector.state(),
        ProjectorState::Failed {
            track: "monaco".to_string(),
            error: GeometryError::Superseded,
        }
    );
}

#[tokio::test]
async fn test_reselecting_ready_track_is_a_no_op() {
    let projector = projector(StaticSource::default().serve("suzuka", SIMPLE_LINE));
    let geometry = projector.load("suzuka").await.unwrap();

    projector.select_track("suzuka").await.unwrap();

    assert_eq!(projector.generation(), 1);
    assert_eq!(projector.state(), ProjectorState::Ready(geometry));
}

#[tokio::test]
async fn test_session_cars_placed_on_projected_track() {
    let projector = projector(StaticSource::default().serve("suzuka", SIMPLE_LINE));
    let geometry = projector.load("suzuka").await.unwrap();

    let mut session = RaceSession::create(SessionConfig {
        circuit: Some("suzuka".to_string()),
        ..Default::default()
    });
    session.on_frame(r#"{"type":"telemetry","driver":"VER","position_from_start_km":0.0}"#);
    session.on_frame(r#"{"type":"telemetry","driver":"LEC","position_from_start_km":2.74}"#);

    let snapshot = session.renders().take().unwrap();
    let cars = snapshot.all_positions();
    let markers = place_markers(&geometry, &cars, Some(&Highlight::new("LEC", 100.0)));

    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0].code, "LEC");
    assert!(markers[0].highlighted);
    assert_eq!(markers[0].color, HslColor::WHITE);
    assert_eq!(Some(markers[0].point), geometry.point_at_scalar(100.0));

    assert_eq!(markers[1].code, "VER");
    assert_eq!(Some(markers[1].point), geometry.point_at_scalar(0.0));
    session.dispose().await;
}
