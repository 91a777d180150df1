//! Race feed client.
//!
//! Owns the WebSocket connection lifecycle and turns raw frames into
//! [`TelemetryMessage`]s. Malformed frames are dropped here and never reach
//! reconciliation.
//!
//! # Example
//!
//! ```ignore
//! use trackside::feed::{FeedClient, FeedConfig, FeedEvent};
//!
//! let (handle, mut events) = FeedClient::connect(FeedConfig::new("ws://localhost:8765"))?;
//! while let Some(event) = events.recv().await {
//!     if let FeedEvent::Message(msg) = event {
//!         println!("{}", msg.kind());
//!     }
//! }
//! handle.close().await;
//! ```

mod client;
mod message;
mod status;

pub use client::{
    FeedClient, FeedConfig, FeedError, FeedEvent, FeedHandle, DEFAULT_EVENT_CAPACITY,
    DEFAULT_FEED_URL, DEFAULT_RECONNECT_DELAY,
};
pub use message::{
    decode_binary, decode_frame, LeaderboardEntry, ParseFailure, Prediction, PredictionPayload,
    TelemetryMessage, TelemetryUpdate,
};
pub use status::{ConnectionStatus, FeedStatus};
