//! The race session service object.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::circuit;
use crate::feed::{
    decode_frame, ConnectionStatus, FeedClient, FeedConfig, FeedError, FeedEvent, FeedHandle,
    TelemetryMessage,
};
use crate::metrics::{
    ComparisonPoint, MetricsConfig, MetricsEstimator, MetricsReading, SpeedComparison,
};
use crate::state::{RaceState, StateChange};
use crate::views::{
    all_positions, leaderboard, prediction_rows, top_n_by_progress, DriverProgress,
    LeaderboardRow, PredictionRow, DEFAULT_TOP_N,
};

use super::coalescer::Coalescer;

/// Default render tick.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Configuration for a [`RaceSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Feed endpoint and reconnect policy.
    pub feed: FeedConfig,
    /// Circuit being raced, used for lap lengths.
    pub circuit: Option<String>,
    /// How often the render side should pull snapshots.
    pub tick: Duration,
    /// Drivers in the top-N progress view.
    pub top_n: usize,
    /// Rolling metrics settings.
    pub metrics: MetricsConfig,
    /// Pair of driver codes whose speed traces are compared.
    pub compare: Option<(String, String)>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            circuit: None,
            tick: DEFAULT_TICK,
            top_n: DEFAULT_TOP_N,
            metrics: MetricsConfig::default(),
            compare: None,
        }
    }
}

/// Point-in-time copy of a session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceSnapshot {
    /// Increases with every published snapshot.
    pub sequence: u64,
    pub connection: ConnectionStatus,
    pub circuit: Option<String>,
    pub state: RaceState,
    /// Latest rolling reading per driver that has reported a speed.
    pub metrics: HashMap<String, MetricsReading>,
    /// Newest aligned point of the head-to-head comparison, if one is set.
    pub comparison: Option<ComparisonPoint>,
}

impl RaceSnapshot {
    /// Lap length of the current circuit, if one is set.
    pub fn lap_length_km(&self) -> Option<f64> {
        self.circuit.as_deref().map(circuit::lap_length_km)
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardRow> {
        leaderboard(&self.state)
    }

    pub fn top_n(&self, n: usize) -> Vec<DriverProgress> {
        top_n_by_progress(&self.state, self.lap_length_km(), n)
    }

    pub fn all_positions(&self) -> Vec<DriverProgress> {
        all_positions(&self.state, self.lap_length_km())
    }

    pub fn predictions(&self, limit: usize) -> Vec<PredictionRow> {
        prediction_rows(&self.state, limit)
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }

    pub fn reading(&self, code: &str) -> Option<MetricsReading> {
        self.metrics.get(code).copied()
    }
}

/// Owns the reconciled state of one race feed.
///
/// All mutation happens through `&mut self`, so whichever task owns the
/// session is the single writer. Every observable change publishes a
/// [`RaceSnapshot`] to the render [`Coalescer`].
pub struct RaceSession {
    config: SessionConfig,
    state: RaceState,
    connection: ConnectionStatus,
    metrics: MetricsEstimator,
    comparison: Option<SpeedComparison>,
    renders: Arc<Coalescer<RaceSnapshot>>,
    sequence: u64,
    started: Instant,
    feed: Option<FeedHandle>,
    events: Option<mpsc::Receiver<FeedEvent>>,
}

impl RaceSession {
    /// Create a session with empty state. No connection is opened yet.
    pub fn create(config: SessionConfig) -> Self {
        let metrics = MetricsEstimator::new(config.metrics.clone());
        let comparison = config
            .compare
            .as_ref()
            .map(|(a, b)| SpeedComparison::new(a.as_str(), b.as_str()));
        Self {
            config,
            state: RaceState::new(),
            connection: ConnectionStatus::Connecting,
            metrics,
            comparison,
            renders: Arc::new(Coalescer::new()),
            sequence: 0,
            started: Instant::now(),
            feed: None,
            events: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &RaceState {
        &self.state
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn metrics(&self) -> &MetricsEstimator {
        &self.metrics
    }

    pub fn comparison(&self) -> Option<&SpeedComparison> {
        self.comparison.as_ref()
    }

    /// Compare the speed traces of two drivers, or stop comparing with `None`.
    ///
    /// Re-selecting the current pair keeps its history.
    pub fn set_comparison(&mut self, pair: Option<(String, String)>) {
        self.comparison = match (pair.as_ref(), self.comparison.take()) {
            (Some((a, b)), Some(mut cmp)) => {
                cmp.set_drivers(a, b);
                Some(cmp)
            }
            (Some((a, b)), None) => Some(SpeedComparison::new(a.as_str(), b.as_str())),
            (None, _) => None,
        };
        if self.config.compare != pair {
            self.config.compare = pair;
            self.publish();
        }
    }

    /// The render hand-off. Consumers `take()` once per tick or await `next()`.
    pub fn renders(&self) -> Arc<Coalescer<RaceSnapshot>> {
        Arc::clone(&self.renders)
    }

    /// Current snapshot, without publishing it.
    pub fn snapshot(&self) -> RaceSnapshot {
        let metrics = self
            .state
            .drivers()
            .iter()
            .filter_map(|d| self.metrics.reading(&d.code).map(|r| (d.code.clone(), r)))
            .collect();
        RaceSnapshot {
            sequence: self.sequence,
            connection: self.connection,
            circuit: self.config.circuit.clone(),
            state: self.state.clone(),
            metrics,
            comparison: self
                .comparison
                .as_ref()
                .and_then(|cmp| cmp.history().last().cloned()),
        }
    }

    /// Change the circuit used for lap-length lookups.
    pub fn set_circuit(&mut self, circuit: Option<String>) {
        if self.config.circuit != circuit {
            info!(circuit = ?circuit, "Circuit changed");
            self.config.circuit = circuit;
            self.publish();
        }
    }

    /// Open the feed connection for the configured endpoint.
    ///
    /// Any previous connection is torn down first.
    pub fn connect(&mut self) -> Result<(), FeedError> {
        self.disconnect();
        let (handle, events) = FeedClient::connect(self.config.feed.clone())?;
        info!(url = %handle.url(), "Session connected to feed");
        self.feed = Some(handle);
        self.events = Some(events);
        Ok(())
    }

    /// Point the session at a different endpoint and reconnect.
    pub fn switch_endpoint(&mut self, url: impl Into<String>) -> Result<(), FeedError> {
        self.config.feed.url = url.into();
        self.connect()
    }

    fn disconnect(&mut self) {
        // Dropping the handle cancels its task synchronously.
        self.feed = None;
        self.events = None;
    }

    /// Decode and apply one raw frame. Malformed frames change nothing.
    pub fn on_frame(&mut self, raw: &str) -> StateChange {
        match decode_frame(raw) {
            Ok(message) => self.on_message(&message),
            Err(e) => {
                debug!(error = %e, "Ignoring malformed frame");
                StateChange::Unchanged
            }
        }
    }

    /// Apply one decoded message.
    pub fn on_message(&mut self, message: &TelemetryMessage) -> StateChange {
        let change = self.state.apply(message);
        match &change {
            StateChange::Drivers(codes) => {
                let now = self.started.elapsed().as_secs_f64();
                self.metrics
                    .observe(&self.state, codes.iter().map(String::as_str), now);
                if let Some(cmp) = self.comparison.as_mut() {
                    let (a, b) = cmp.drivers();
                    if codes.iter().any(|c| c == a || c == b) {
                        let wall = Utc::now().timestamp_millis() as f64 / 1000.0;
                        cmp.observe(&self.state, wall);
                    }
                }
            }
            StateChange::Error => {
                warn!(error = ?self.state.error(), "Race feed reported an error");
            }
            StateChange::Predictions | StateChange::Unchanged => {}
        }

        if change.is_changed() {
            self.publish();
        }
        change
    }

    /// Fold one feed event into the session.
    pub fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Message(message) => {
                self.on_message(&message);
            }
            FeedEvent::Status(connection) => {
                self.connection = connection;
                if connection.is_open() {
                    self.state.clear_error();
                }
                self.publish();
            }
            FeedEvent::TransportError(error) => {
                self.state.set_error(error);
                self.publish();
            }
        }
    }

    /// Process feed events until the feed ends or `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let Some(mut events) = self.events.take() else {
            warn!("Session run without a feed connection");
            return;
        };

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }

        self.events = Some(events);
    }

    /// Tear down the connection and stop publishing.
    pub async fn dispose(&mut self) {
        self.events = None;
        if let Some(handle) = self.feed.take() {
            handle.close().await;
        }
        self.connection = ConnectionStatus::Closed;
        self.renders.close();
        info!(published = self.renders.published(), "Session disposed");
    }

    fn publish(&mut self) {
        self.sequence += 1;
        let snapshot = self.snapshot();
        self.renders.publish(snapshot);
    }
}

impl Drop for RaceSession {
    fn drop(&mut self) {
        self.renders.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::decode_frame;

    fn session() -> RaceSession {
        RaceSession::create(SessionConfig {
            circuit: Some("monaco".to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_leaderboard_then_telemetry() {
        let mut s = session();
        s.on_frame(r#"{"type":"leaderboard","data":[{"position":1,"code":"VER"}]}"#);
        s.on_frame(
            r#"{"type":"telemetry","driver":"VER","speed_kmh":310,"position_from_start_km":2.5}"#,
        );

        let ver = s.state().driver("VER").unwrap();
        assert_eq!(ver.rank, Some(1));
        assert_eq!(ver.speed_kmh, Some(310.0));
        assert_eq!(ver.km, 2.5);
        assert_eq!(ver.lap, None);
        assert!(s.metrics().reading("VER").is_some());
    }

    #[tokio::test]
    async fn test_integral_float_frames_are_applied() {
        let mut s = session();
        let change = s.on_frame(
            r#"{"type":"telemetry","driver":"VER","position":1.0,"lap_number":3.0,"speed_kmh":300}"#,
        );
        assert_eq!(change, StateChange::Drivers(vec!["VER".to_string()]));

        s.on_frame(r#"{"type":"leaderboard","data":[{"position":null,"code":"VER"},{"position":2,"code":"HAM"}]}"#);

        let ver = s.state().driver("VER").unwrap();
        assert_eq!(ver.rank, Some(1));
        assert_eq!(ver.lap, Some(3));
        assert_eq!(s.state().driver("HAM").unwrap().rank, Some(2));
    }

    #[tokio::test]
    async fn test_snapshot_carries_metric_readings() {
        let mut s = session();
        s.on_frame(r#"{"type":"telemetry","driver":"VER","speed_kmh":300}"#);
        s.on_frame(r#"{"type":"telemetry","driver":"LEC","position_from_start_km":1.0}"#);

        let snapshot = s.snapshot();
        assert_eq!(snapshot.reading("VER").map(|r| r.throttle), Some(100));
        assert_eq!(snapshot.reading("LEC"), None);
        assert!(snapshot.comparison.is_none());
    }

    #[tokio::test]
    async fn test_comparison_follows_selected_pair() {
        let mut s = RaceSession::create(SessionConfig {
            compare: Some(("VER".to_string(), "HAM".to_string())),
            ..Default::default()
        });
        s.on_frame(r#"{"type":"telemetry","driver":"LEC","speed_kmh":280}"#);
        assert!(s.snapshot().comparison.is_none());

        s.on_frame(r#"{"type":"telemetry","driver":"VER","speed_kmh":360,"position_from_start_km":2.0}"#);
        s.on_frame(r#"{"type":"telemetry","driver":"HAM","speed_kmh":360,"position_from_start_km":2.1}"#);

        let point = s.snapshot().comparison.unwrap();
        assert_eq!(point.speed1, 360.0);
        assert_eq!(point.speed2, 360.0);
        assert!(point.delta_secs > 0.0);

        s.set_comparison(None);
        assert!(s.comparison().is_none());
        assert!(s.snapshot().comparison.is_none());
    }

    #[tokio::test]
    async fn test_malformed_frame_changes_nothing() {
        let mut s = session();
        s.on_frame(r#"{"type":"telemetry","driver":"VER","position_from_start_km":1.0}"#);
        let before = s.snapshot();
        let renders = s.renders();
        renders.take();

        assert_eq!(s.on_frame("not json"), StateChange::Unchanged);
        assert_eq!(s.snapshot(), before);
        assert!(s.state().error().is_none());
        assert!(!renders.has_pending());
    }

    #[tokio::test]
    async fn test_burst_is_coalesced() {
        let mut s = session();
        let renders = s.renders();
        for i in 0..50 {
            s.on_frame(&format!(
                r#"{{"type":"telemetry","driver":"VER","position_from_start_km":{}}}"#,
                i as f64 * 0.1
            ));
        }

        let snapshot = renders.take().unwrap();
        assert_eq!(snapshot.sequence, 50);
        assert!((snapshot.state.driver("VER").unwrap().km - 4.9).abs() < 1e-9);
        assert!(renders.take().is_none());
    }

    #[tokio::test]
    async fn test_status_and_errors() {
        let mut s = session();
        s.handle_event(FeedEvent::TransportError("connection reset".to_string()));
        assert_eq!(s.state().error(), Some("connection reset"));

        s.handle_event(FeedEvent::Status(ConnectionStatus::Open));
        assert_eq!(s.connection(), ConnectionStatus::Open);
        assert_eq!(s.state().error(), None);

        s.handle_event(FeedEvent::Message(
            decode_frame(r#"{"type":"error"}"#).unwrap(),
        ));
        assert_eq!(s.state().error(), Some("server error"));
        assert_eq!(s.connection(), ConnectionStatus::Open);
    }

    #[tokio::test]
    async fn test_snapshot_views_use_circuit_lap_length() {
        let mut s = session();
        s.on_frame(r#"{"type":"telemetry","driver":"LEC","position_from_start_km":4.98}"#);

        let snapshot = s.renders().take().unwrap();
        assert_eq!(snapshot.lap_length_km(), Some(3.32));
        let top = snapshot.top_n(5);
        assert!((top[0].scalar - 50.0).abs() < 1e-6);

        s.set_circuit(None);
        let degraded = s.renders().take().unwrap();
        assert_eq!(degraded.top_n(5)[0].scalar, 4.98);
    }

    #[tokio::test]
    async fn test_dispose_closes_renders() {
        let mut s = session();
        let renders = s.renders();
        s.dispose().await;
        assert!(renders.is_closed());
        assert_eq!(s.connection(), ConnectionStatus::Closed);
        assert_eq!(renders.next().await, None);
    }

    #[tokio::test]
    async fn test_run_without_connection_returns() {
        let mut s = session();
        s.run(CancellationToken::new()).await;
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let mut s = RaceSession::create(SessionConfig {
            feed: FeedConfig::new("http://nope"),
            ..Default::default()
        });
        assert!(s.connect().is_err());
    }
}
