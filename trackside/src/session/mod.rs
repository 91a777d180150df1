//! Race session: the stateful service tying feed, state and views together.
//!
//! # Architecture
//!
//! ```text
//! FeedClient ──FeedEvent──► RaceSession ──publish──► Coalescer ──take/next──► renderer
//!                          (single writer)          (single slot)
//! ```
//!
//! The session task applies events in arrival order. The renderer pulls at
//! most one snapshot per tick; intermediate snapshots are overwritten.

mod coalescer;
mod race;

pub use coalescer::Coalescer;
pub use race::{RaceSession, RaceSnapshot, SessionConfig, DEFAULT_TICK};
