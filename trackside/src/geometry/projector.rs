//! Track geometry loading state machine.
//!
//! ```text
//! Idle ──select_track──► Loading ──► Ready
//!                          ▲   └───► Failed
//!                          └── select_track (any state)
//! ```
//!
//! Selecting the track that is already loading or ready changes nothing.
//! Every other selection takes a new generation number and a fresh cancellation
//! token; the previous token is cancelled. A result is only committed if its
//! generation is still the latest, so a slow load for an old track can never
//! overwrite the state of the current one. A load cancelled by
//! [`TrackProjector::shutdown`] is still the latest, so it ends in
//! `Failed` with [`GeometryError::Superseded`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::circuit::{self, DEFAULT_GEOMETRY_BASE_URL};

use super::error::GeometryError;
use super::geojson::{normalize, parse_document};
use super::projection::{MercatorProjection, ProjectionStrategy};
use super::source::GeometrySource;
use super::track::{build_geometry, BuildOptions, TrackGeometry};

/// Configuration for [`TrackProjector`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectorConfig {
    /// Directory URL holding `{id}.geojson` outlines.
    pub geometry_base_url: String,
    /// Canvas and padding used when projecting.
    pub build: BuildOptions,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            geometry_base_url: DEFAULT_GEOMETRY_BASE_URL.to_string(),
            build: BuildOptions::default(),
        }
    }
}

/// Observable projector state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ProjectorState {
    /// No track selected yet.
    #[default]
    Idle,
    /// A load for `track` is in flight.
    Loading { track: String },
    /// The current track is ready to draw.
    Ready(Arc<TrackGeometry>),
    /// Loading the current track failed; draw a fallback instead.
    Failed { track: String, error: GeometryError },
}

impl ProjectorState {
    pub fn geometry(&self) -> Option<&Arc<TrackGeometry>> {
        match self {
            ProjectorState::Ready(geometry) => Some(geometry),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ProjectorState::Loading { .. })
    }

    /// Track the state refers to, if any.
    pub fn track(&self) -> Option<&str> {
        match self {
            ProjectorState::Idle => None,
            ProjectorState::Loading { track } | ProjectorState::Failed { track, .. } => {
                Some(track)
            }
            ProjectorState::Ready(geometry) => Some(&geometry.track),
        }
    }
}

/// Fetch, normalize and project one track outline.
pub async fn fetch_track_geometry<S: GeometrySource + ?Sized>(
    source: &S,
    track: &str,
    config: &ProjectorConfig,
    projection: &dyn ProjectionStrategy,
) -> Result<TrackGeometry, GeometryError> {
    let url = circuit::geometry_url(&config.geometry_base_url, track);
    debug!(track = %track, url = %url, "Fetching track geometry");

    let bytes = source.fetch(&url).await?;
    let document = parse_document(&bytes)?;
    let normalized = normalize(&document)?;
    build_geometry(track, &normalized, projection, &config.build)
}

struct Ticket {
    generation: u64,
    track: String,
    token: CancellationToken,
}

struct Shared {
    generation: AtomicU64,
    inflight: Mutex<Option<CancellationToken>>,
    state: watch::Sender<ProjectorState>,
    shutdown: CancellationToken,
}

/// Loads track outlines and publishes the latest one.
///
/// Cloning is cheap; clones share the same state.
pub struct TrackProjector<S> {
    source: Arc<S>,
    projection: Arc<dyn ProjectionStrategy>,
    config: Arc<ProjectorConfig>,
    shared: Arc<Shared>,
}

impl<S> Clone for TrackProjector<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            projection: Arc::clone(&self.projection),
            config: Arc::clone(&self.config),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: GeometrySource + 'static> TrackProjector<S> {
    /// Create a projector using the Mercator projection.
    pub fn new(source: S, config: ProjectorConfig) -> Self {
        Self::with_projection(source, config, Arc::new(MercatorProjection))
    }

    /// Create a projector with a custom projection.
    pub fn with_projection(
        source: S,
        config: ProjectorConfig,
        projection: Arc<dyn ProjectionStrategy>,
    ) -> Self {
        let (state, _) = watch::channel(ProjectorState::Idle);
        Self {
            source: Arc::new(source),
            projection,
            config: Arc::new(config),
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                inflight: Mutex::new(None),
                state,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ProjectorState {
        self.shared.state.borrow().clone()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ProjectorState> {
        self.shared.state.subscribe()
    }

    /// Generation of the latest selection.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Select a track and load it in the background.
    pub fn select_track(&self, track: &str) -> JoinHandle<()> {
        if self.is_current(track) {
            debug!(track = %track, "Track already selected");
            return tokio::spawn(async {});
        }
        let ticket = self.begin(track);
        let this = self.clone();
        tokio::spawn(async move {
            let _ = this.run(ticket).await;
        })
    }

    /// Select a track and wait for its load to finish.
    ///
    /// Returns [`GeometryError::Superseded`] if another selection replaced
    /// this one first.
    ///
    /// If `track` is already ready its geometry is returned as is; if it is
    /// already loading, this waits for that load instead of starting another.
    pub async fn load(&self, track: &str) -> Result<Arc<TrackGeometry>, GeometryError> {
        if self.is_current(track) {
            return self.settled(track).await;
        }
        let ticket = self.begin(track);
        self.run(ticket).await
    }

    /// Cancel any in-flight load and refuse further ones.
    pub fn shutdown(&self) {
        self.shared.shutdown.cancel();
    }

    fn is_current(&self, track: &str) -> bool {
        let state = self.shared.state.borrow();
        matches!(
            *state,
            ProjectorState::Loading { .. } | ProjectorState::Ready(_)
        ) && state.track() == Some(track)
    }

    async fn settled(&self, track: &str) -> Result<Arc<TrackGeometry>, GeometryError> {
        let mut rx = self.subscribe();
        let state = rx
            .wait_for(|s| !(s.is_loading() && s.track() == Some(track)))
            .await
            .map_err(|_| GeometryError::Superseded)?
            .clone();
        match state {
            ProjectorState::Ready(geometry) if geometry.track == track => Ok(geometry),
            ProjectorState::Failed { track: failed, error } if failed == track => Err(error),
            _ => Err(GeometryError::Superseded),
        }
    }

    fn begin(&self, track: &str) -> Ticket {
        let token = self.shared.shutdown.child_token();
        let mut inflight = self.shared.inflight.lock();
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = inflight.replace(token.clone()) {
            previous.cancel();
        }
        self.shared.state.send_replace(ProjectorState::Loading {
            track: track.to_string(),
        });
        drop(inflight);

        info!(track = %track, generation, "Selecting track");
        Ticket {
            generation,
            track: track.to_string(),
            token,
        }
    }

    async fn run(&self, ticket: Ticket) -> Result<Arc<TrackGeometry>, GeometryError> {
        let result = tokio::select! {
            biased;
            _ = ticket.token.cancelled() => Err(GeometryError::Superseded),
            result = fetch_track_geometry(
                self.source.as_ref(),
                &ticket.track,
                &self.config,
                self.projection.as_ref(),
            ) => result.map(Arc::new),
        };

        self.commit(&ticket, &result);
        result
    }

    fn commit(&self, ticket: &Ticket, result: &Result<Arc<TrackGeometry>, GeometryError>) {
        let mut inflight = self.shared.inflight.lock();
        if self.shared.generation.load(Ordering::SeqCst) != ticket.generation {
            debug!(
                track = %ticket.track,
                generation = ticket.generation,
                "Discarding stale track geometry"
            );
            return;
        }
        *inflight = None;

        let next = match result {
            Ok(geometry) => {
                info!(
                    track = %ticket.track,
                    paths = geometry.paths.len(),
                    "Track geometry ready"
                );
                ProjectorState::Ready(Arc::clone(geometry))
            }
            Err(GeometryError::Superseded) => {
                debug!(track = %ticket.track, generation = ticket.generation, "Track load cancelled");
                ProjectorState::Failed {
                    track: ticket.track.clone(),
                    error: GeometryError::Superseded,
                }
            }
            Err(error) => {
                warn!(track = %ticket.track, error = %error, "Track geometry failed");
                ProjectorState::Failed {
                    track: ticket.track.clone(),
                    error: error.clone(),
                }
            }
        };
        self.shared.state.send_replace(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::source::tests::MockGeometrySource;
    use std::time::Duration;

    const BASE: &str = "http://tracks.test";

    fn config() -> ProjectorConfig {
        ProjectorConfig {
            geometry_base_url: BASE.to_string(),
            build: BuildOptions::default(),
        }
    }

    fn line_doc() -> Vec<u8> {
        br#"{"type":"LineString","coordinates":[[7.42,43.73],[7.43,43.74],[7.44,43.73]]}"#.to_vec()
    }

    #[tokio::test]
    async fn test_load_ready() {
        let source = MockGeometrySource::default().with(&format!("{BASE}/mc-1929.geojson"), Ok(line_doc()));
        let projector = TrackProjector::new(source, config());
        assert_eq!(projector.state(), ProjectorState::Idle);

        let geometry = projector.load("monaco").await.unwrap();
        assert_eq!(geometry.paths.len(), 1);
        assert_eq!(geometry.track, "monaco");
        assert_eq!(projector.state().geometry(), Some(&geometry));
    }

    #[tokio::test]
    async fn test_load_failures_surface_as_failed() {
        let source = MockGeometrySource::default()
            .with(&format!("{BASE}/bad.geojson"), Ok(b"not json".to_vec()))
            .with(
                &format!("{BASE}/points.geojson"),
                Ok(br#"{"type":"Point","coordinates":[0,0]}"#.to_vec()),
            );
        let projector = TrackProjector::new(source, config());

        assert!(matches!(projector.load("bad").await, Err(GeometryError::Parse(_))));
        assert!(matches!(
            projector.state(),
            ProjectorState::Failed { error: GeometryError::Parse(_), .. }
        ));

        assert_eq!(projector.load("points").await, Err(GeometryError::NoDrawablePath));
        assert!(matches!(projector.load("missing").await, Err(GeometryError::Fetch(_))));
        assert_eq!(projector.state().track(), Some("missing"));
    }

    #[tokio::test]
    async fn test_newer_selection_wins() {
        let slow = format!("{BASE}/slow.geojson");
        let fast = format!("{BASE}/fast.geojson");
        let source = MockGeometrySource::default()
            .with(&slow, Ok(line_doc()))
            .delayed(&slow, Duration::from_millis(200))
            .with(&fast, Ok(line_doc()));
        let projector = TrackProjector::new(source, config());

        let first = projector.select_track("slow");
        let second = projector.load("fast").await.unwrap();
        first.await.unwrap();

        assert_eq!(second.track, "fast");
        assert_eq!(projector.state().track(), Some("fast"));
        assert_eq!(projector.generation(), 2);
    }

    #[tokio::test]
    async fn test_superseded_load_reports_error() {
        let slow = format!("{BASE}/slow.geojson");
        let source = MockGeometrySource::default()
            .with(&slow, Ok(line_doc()))
            .delayed(&slow, Duration::from_millis(500));
        let projector = TrackProjector::new(source, config());

        let other = projector.clone();
        let pending = tokio::spawn(async move { other.load("slow").await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        projector.select_track("nowhere").await.unwrap();

        assert_eq!(pending.await.unwrap(), Err(GeometryError::Superseded));
        assert_eq!(projector.state().track(), Some("nowhere"));
        assert!(matches!(projector.state(), ProjectorState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_shutdown_during_load_ends_failed() {
        let slow = format!("{BASE}/slow.geojson");
        let source = MockGeometrySource::default()
            .with(&slow, Ok(line_doc()))
            .delayed(&slow, Duration::from_secs(10));
        let projector = TrackProjector::new(source, config());

        let other = projector.clone();
        let pending = tokio::spawn(async move { other.load("slow").await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(projector.state().is_loading());

        projector.shutdown();
        assert_eq!(pending.await.unwrap(), Err(GeometryError::Superseded));
        assert_eq!(
            projector.state(),
            ProjectorState::Failed {
                track: "slow".to_string(),
                error: GeometryError::Superseded,
            }
        );

        // Later selections are refused the same way.
        assert_eq!(projector.load("monaco").await, Err(GeometryError::Superseded));
        assert!(!projector.state().is_loading());
    }

    #[tokio::test]
    async fn test_reselecting_ready_track_keeps_geometry() {
        let url = format!("{BASE}/mc-1929.geojson");
        let source = MockGeometrySource::default().with(&url, Ok(line_doc()));
        let projector = TrackProjector::new(source, config());
        let mut rx = projector.subscribe();

        let geometry = projector.load("monaco").await.unwrap();
        rx.borrow_and_update();

        projector.select_track("monaco").await.unwrap();
        let again = projector.load("monaco").await.unwrap();

        assert!(Arc::ptr_eq(&geometry, &again));
        assert_eq!(projector.generation(), 1);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(projector.source.requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_reselecting_loading_track_joins_it() {
        let slow = format!("{BASE}/slow.geojson");
        let source = MockGeometrySource::default()
            .with(&slow, Ok(line_doc()))
            .delayed(&slow, Duration::from_millis(100));
        let projector = TrackProjector::new(source, config());

        let first = projector.select_track("slow");
        let joined = projector.load("slow").await.unwrap();
        first.await.unwrap();

        assert_eq!(joined.track, "slow");
        assert_eq!(projector.generation(), 1);
        assert_eq!(projector.source.requests.lock().len(), 1);
        assert_eq!(projector.state().geometry(), Some(&joined));
    }

    #[tokio::test]
    async fn test_reselecting_failed_track_retries() {
        let projector = TrackProjector::new(MockGeometrySource::default(), config());

        assert!(projector.load("missing").await.is_err());
        assert!(projector.load("missing").await.is_err());
        assert_eq!(projector.generation(), 2);
    }

    #[tokio::test]
    async fn test_subscribe_sees_loading_then_ready() {
        let source = MockGeometrySource::default().with(&format!("{BASE}/mc-1929.geojson"), Ok(line_doc()));
        let projector = TrackProjector::new(source, config());
        let mut rx = projector.subscribe();

        projector.select_track("monaco");
        rx.wait_for(|s| s.geometry().is_some()).await.unwrap();
        assert!(matches!(projector.state(), ProjectorState::Ready(_)));
    }
}
