//! Inbound feed message types and frame decoding.
//!
//! Every frame on the feed is a JSON object tagged by `type`. Decoding is
//! explicit: [`decode_frame`] returns a [`ParseFailure`] for anything that is
//! not a recognizable message, and callers decide what to do with it (the
//! session drops it).

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// A decoded feed message.
///
/// Payload fields are independently optional; a telemetry message may carry
/// only speed, only position, or everything at once.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TelemetryMessage {
    /// Per-driver telemetry update.
    Telemetry(TelemetryUpdate),

    /// Informational message from the server. Ignored by reconciliation.
    Info {
        #[serde(default)]
        message: Option<String>,
    },

    /// Error reported by the server.
    Error {
        #[serde(default)]
        message: Option<String>,
    },

    /// Rank-only leaderboard update.
    Leaderboard {
        #[serde(default)]
        data: Option<Vec<LeaderboardEntry>>,
    },

    /// Race outcome predictions.
    Prediction {
        #[serde(default)]
        data: Option<PredictionPayload>,
    },
}

impl TelemetryMessage {
    /// Short name of the message type, as it appears in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryMessage::Telemetry(_) => "telemetry",
            TelemetryMessage::Info { .. } => "info",
            TelemetryMessage::Error { .. } => "error",
            TelemetryMessage::Leaderboard { .. } => "leaderboard",
            TelemetryMessage::Prediction { .. } => "prediction",
        }
    }
}

/// Payload of a `telemetry` message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TelemetryUpdate {
    /// Driver code (e.g. `VER`).
    #[serde(default)]
    pub driver: Option<String>,
    /// Current lap number.
    #[serde(default, deserialize_with = "lenient_u32")]
    pub lap_number: Option<u32>,
    /// Race position.
    #[serde(default, deserialize_with = "lenient_u32")]
    pub position: Option<u32>,
    /// Cumulative distance from the start line in kilometers.
    #[serde(default)]
    pub position_from_start_km: Option<f64>,
    /// Current speed in km/h.
    #[serde(default)]
    pub speed_kmh: Option<f64>,
}

/// A single `{position, code}` leaderboard entry.
///
/// An entry without a usable position is kept but carries no rank.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub position: Option<u32>,
    pub code: String,
}

/// Accept any JSON number with no fractional part that fits in a `u32`
/// (`3`, `3.0`). Anything else, including `null`, strings and `2.5`, reads
/// as `None` instead of failing the frame.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(integral_u32(&value))
}

fn integral_u32(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    let f = value.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f64 {
        Some(f as u32)
    } else {
        None
    }
}

/// Payload of a `prediction` message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PredictionPayload {
    #[serde(default)]
    pub predictions: Option<Vec<Prediction>>,
    /// Mean absolute error of the model, in seconds.
    #[serde(default)]
    pub mae_seconds: Option<f64>,
}

/// A predicted race time for one driver.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Prediction {
    pub driver: String,
    pub predicted_seconds: f64,
}

/// A frame that could not be decoded into a [`TelemetryMessage`].
#[derive(Debug, Error)]
pub enum ParseFailure {
    /// The frame was not valid JSON or did not match any message shape.
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The frame was a binary payload; the feed only speaks JSON text.
    #[error("Unexpected binary frame ({0} bytes)")]
    Binary(usize),
}

/// Decode a raw text frame.
pub fn decode_frame(raw: &str) -> Result<TelemetryMessage, ParseFailure> {
    Ok(serde_json::from_str(raw)?)
}

/// Decode a binary frame holding UTF-8 JSON.
///
/// Some feed servers send JSON in binary frames; anything that is not valid
/// UTF-8 is rejected.
pub fn decode_binary(raw: &[u8]) -> Result<TelemetryMessage, ParseFailure> {
    match std::str::from_utf8(raw) {
        Ok(text) => decode_frame(text),
        Err(_) => Err(ParseFailure::Binary(raw.len())),
    }
}
