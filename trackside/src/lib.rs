//! Trackside - live race telemetry reconciliation and track map projection.
//!
//! This library turns a live WebSocket stream of race telemetry into a
//! consistent snapshot of every car on track, and projects GeoJSON circuit
//! outlines into 2D paths on which those cars can be placed.
//!
//! # Architecture
//!
//! ```text
//! FeedClient ──► RaceSession ──► Coalescer ──► views ──► renderer
//!  (feed)        (state)         (session)     (views)
//!                   │
//!                   └──► MetricsEstimator (metrics)
//!
//! TrackProjector (geometry) ── keyed by circuit ──► place_markers
//! ```

pub mod circuit;
pub mod config;
pub mod feed;
pub mod geometry;
pub mod logging;
pub mod metrics;
pub mod session;
pub mod state;
pub mod views;

/// Library version, from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
