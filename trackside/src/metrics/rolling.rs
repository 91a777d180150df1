//! Rolling driving-style proxies.
//!
//! Keeps a short sliding window of speed samples per driver and derives three
//! heuristic percentages from it:
//!
//! - **throttle**: current speed relative to the window's peak
//! - **braking**: share of sample pairs with a strong deceleration
//! - **cornering**: share of samples in the mid-speed band
//!
//! None of these are physical measurements; they only use speed over time.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::state::RaceState;

/// Default lookback horizon.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(4);

/// Hard cap on samples per window, regardless of horizon.
const DEFAULT_MAX_SAMPLES: usize = 2048;

/// Deceleration above which a sample pair counts as braking, in km/h per second.
const BRAKING_DECEL_KMH_PER_S: f64 = 8.0;

/// Floor on the time between samples when computing deceleration.
const MIN_DT_SECS: f64 = 0.05;

/// Mid-speed band, as fractions of the window peak.
const CORNERING_BAND: (f64, f64) = (0.4, 0.7);

/// Configuration for rolling metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// How much history each window keeps.
    pub window: Duration,
    /// Maximum samples per window.
    pub max_samples: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

/// One speed sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingSample {
    /// Seconds on any monotonic clock.
    pub timestamp: f64,
    /// Speed in km/h.
    pub speed: f64,
}

/// Derived percentages, each in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsReading {
    pub throttle: u8,
    pub braking: u8,
    pub cornering: u8,
}

/// Time-ordered samples for one driver.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: VecDeque<RollingSample>,
    horizon: f64,
    max_samples: usize,
    reading: MetricsReading,
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(&MetricsConfig::default())
    }
}

impl RollingWindow {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            samples: VecDeque::new(),
            horizon: config.window.as_secs_f64(),
            max_samples: config.max_samples.max(1),
            reading: MetricsReading::default(),
        }
    }

    /// Append a sample, evict anything older than the horizon, and recompute.
    ///
    /// Speeds are rounded and floored at zero. A timestamp earlier than the
    /// newest sample is raised to it so the window stays time-ordered.
    pub fn record(&mut self, now: f64, speed_kmh: f64) -> MetricsReading {
        let now = match self.samples.back() {
            Some(last) if now < last.timestamp => last.timestamp,
            _ => now,
        };
        let speed = if speed_kmh.is_finite() {
            speed_kmh.round().max(0.0)
        } else {
            0.0
        };

        self.samples.push_back(RollingSample {
            timestamp: now,
            speed,
        });
        self.evict(now);

        self.reading = compute_reading(&self.samples, speed);
        self.reading
    }

    fn evict(&mut self, now: f64) {
        let cutoff = now - self.horizon;
        while self.samples.front().is_some_and(|s| s.timestamp < cutoff) {
            self.samples.pop_front();
        }
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    /// Latest computed reading.
    pub fn reading(&self) -> MetricsReading {
        self.reading
    }

    /// Samples oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &RollingSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Peak speed in the window.
    pub fn max_speed(&self) -> f64 {
        self.samples.iter().fold(0.0, |m, s| m.max(s.speed))
    }
}

fn percent(count: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

fn compute_reading(samples: &VecDeque<RollingSample>, current: f64) -> MetricsReading {
    let vmax = samples.iter().fold(0.0_f64, |m, s| m.max(s.speed));

    let throttle = if vmax > 0.0 {
        (current / vmax * 100.0).round().clamp(0.0, 100.0) as u8
    } else {
        0
    };

    let braking_pairs = samples
        .iter()
        .zip(samples.iter().skip(1))
        .filter(|(prev, next)| {
            let dt = (next.timestamp - prev.timestamp).max(MIN_DT_SECS);
            (prev.speed - next.speed) / dt > BRAKING_DECEL_KMH_PER_S
        })
        .count();
    let braking = percent(braking_pairs, samples.len().saturating_sub(1));

    let cornering = if vmax > 0.0 {
        let in_band = samples
            .iter()
            .filter(|s| {
                let ratio = s.speed / vmax;
                (CORNERING_BAND.0..=CORNERING_BAND.1).contains(&ratio)
            })
            .count();
        percent(in_band, samples.len())
    } else {
        0
    };

    MetricsReading {
        throttle,
        braking,
        cornering,
    }
}

/// Rolling windows for every driver.
#[derive(Debug, Default)]
pub struct MetricsEstimator {
    config: MetricsConfig,
    windows: HashMap<String, RollingWindow>,
}

impl MetricsEstimator {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
        }
    }

    /// Record one sample for `code`.
    pub fn record(&mut self, code: &str, now: f64, speed_kmh: f64) -> MetricsReading {
        let config = &self.config;
        self.windows
            .entry(code.to_string())
            .or_insert_with(|| RollingWindow::new(config))
            .record(now, speed_kmh)
    }

    /// Sample the drivers in `codes` from a state snapshot.
    ///
    /// Drivers without a reported speed are skipped.
    pub fn observe<'a>(
        &mut self,
        state: &RaceState,
        codes: impl IntoIterator<Item = &'a str>,
        now: f64,
    ) {
        for code in codes {
            if let Some(speed) = state.driver(code).and_then(|d| d.speed_kmh) {
                self.record(code, now, speed);
            }
        }
    }

    /// Sample every driver in a state snapshot.
    pub fn observe_all(&mut self, state: &RaceState, now: f64) {
        for driver in state.drivers() {
            if let Some(speed) = driver.speed_kmh {
                self.record(&driver.code, now, speed);
            }
        }
    }

    pub fn reading(&self, code: &str) -> Option<MetricsReading> {
        self.windows.get(code).map(RollingWindow::reading)
    }

    pub fn window(&self, code: &str) -> Option<&RollingWindow> {
        self.windows.get(code)
    }

    /// Forget one driver's history.
    pub fn reset(&mut self, code: &str) {
        self.windows.remove(code);
    }

    pub fn clear(&mut self) {
        self.windows.clear();
    }
}
