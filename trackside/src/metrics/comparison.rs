//! Head-to-head speed comparison between two drivers.

use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::state::RaceState;

/// How much history each driver keeps.
pub const COMPARISON_HORIZON_SECS: f64 = 12.0;

/// Bucket width of the aligned series.
pub const COMPARISON_STEP_SECS: f64 = 0.3;

/// Maximum points kept in the accumulated history.
pub const MAX_COMPARISON_POINTS: usize = 400;

/// Floor on the average speed used for the time-gap estimate, in km/s.
const MIN_AVG_KM_PER_S: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    t: f64,
    speed: f64,
    km: f64,
}

/// One aligned bucket of the comparison series.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPoint {
    /// Bucket time formatted as local `MM:SS`.
    pub label: String,
    /// Rounded speed of the first driver.
    pub speed1: f64,
    /// Rounded speed of the second driver.
    pub speed2: f64,
    /// Estimated time gap in seconds; positive when the second driver is ahead.
    pub delta_secs: f64,
}

/// Speed traces of two drivers sampled from successive state snapshots.
#[derive(Debug, Clone)]
pub struct SpeedComparison {
    driver1: String,
    driver2: String,
    samples1: VecDeque<Sample>,
    samples2: VecDeque<Sample>,
    last_speed1: f64,
    last_speed2: f64,
    history: VecDeque<ComparisonPoint>,
}

impl SpeedComparison {
    pub fn new(driver1: impl Into<String>, driver2: impl Into<String>) -> Self {
        Self {
            driver1: driver1.into(),
            driver2: driver2.into(),
            samples1: VecDeque::new(),
            samples2: VecDeque::new(),
            last_speed1: 0.0,
            last_speed2: 0.0,
            history: VecDeque::new(),
        }
    }

    pub fn drivers(&self) -> (&str, &str) {
        (&self.driver1, &self.driver2)
    }

    /// Switch the compared pair. Buffers reset if either driver changes.
    pub fn set_drivers(&mut self, driver1: &str, driver2: &str) {
        if self.driver1 == driver1 && self.driver2 == driver2 {
            return;
        }
        *self = Self::new(driver1, driver2);
    }

    /// Sample both drivers from `state` at time `now` (seconds since the Unix
    /// epoch) and append the new buckets to the history.
    ///
    /// Returns `false` if neither driver had a speed to record.
    pub fn observe(&mut self, state: &RaceState, now: f64) -> bool {
        let mut updated = false;
        for (code, samples) in [
            (&self.driver1, &mut self.samples1),
            (&self.driver2, &mut self.samples2),
        ] {
            if let Some(driver) = state.driver(code) {
                if let Some(speed) = driver.speed_kmh {
                    samples.push_back(Sample {
                        t: now,
                        speed: speed.max(0.0),
                        km: driver.km,
                    });
                    updated = true;
                }
            }
        }
        if !updated {
            return false;
        }

        let points = self.series(now);
        self.history.extend(points);
        while self.history.len() > MAX_COMPARISON_POINTS {
            self.history.pop_front();
        }
        true
    }

    /// Bucket the current window into aligned points ending at `now`.
    ///
    /// Each bucket takes the nearest sample of each driver. A driver with no
    /// samples repeats its last known speed.
    pub fn series(&mut self, now: f64) -> Vec<ComparisonPoint> {
        let cutoff = now - COMPARISON_HORIZON_SECS;
        for samples in [&mut self.samples1, &mut self.samples2] {
            while samples.front().is_some_and(|s| s.t < cutoff) {
                samples.pop_front();
            }
        }

        let first = |s: &VecDeque<Sample>| s.front().map_or(now, |s| s.t);
        let t0 = first(&self.samples1).min(first(&self.samples2));

        let mut points = Vec::new();
        let mut step = 0u32;
        loop {
            let t = t0 + f64::from(step) * COMPARISON_STEP_SECS;
            if t > now {
                break;
            }
            let s1 = nearest(&self.samples1, t);
            let s2 = nearest(&self.samples2, t);
            if let Some(s) = s1 {
                self.last_speed1 = s.speed;
            }
            if let Some(s) = s2 {
                self.last_speed2 = s.speed;
            }
            points.push(self.point(t, s1.map(|s| s.km), s2.map(|s| s.km)));
            step += 1;
        }

        if points.is_empty() {
            let km1 = self.samples1.back().map(|s| s.km);
            let km2 = self.samples2.back().map(|s| s.km);
            points.push(self.point(now, km1, km2));
        }
        points
    }

    fn point(&self, t: f64, km1: Option<f64>, km2: Option<f64>) -> ComparisonPoint {
        let speed1 = self.last_speed1.round();
        let speed2 = self.last_speed2.round();
        let avg_km_per_s = ((speed1 + speed2) / 2.0 / 3600.0).max(MIN_AVG_KM_PER_S);
        let delta = (km2.unwrap_or(0.0) - km1.unwrap_or(0.0)) / avg_km_per_s;

        ComparisonPoint {
            label: clock_label(t),
            speed1,
            speed2,
            delta_secs: if delta.is_finite() { delta } else { 0.0 },
        }
    }

    /// Accumulated points, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &ComparisonPoint> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

fn nearest(samples: &VecDeque<Sample>, t: f64) -> Option<Sample> {
    let mut best: Option<(f64, Sample)> = None;
    for s in samples {
        let dt = (s.t - t).abs();
        if best.map_or(true, |(b, _)| dt < b) {
            best = Some((dt, *s));
        }
    }
    best.map(|(_, s)| s)
}

/// Format Unix seconds as local `MM:SS`.
pub fn clock_label(unix_secs: f64) -> String {
    let secs = unix_secs.floor();
    let nanos = ((unix_secs - secs) * 1e9) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
        .map(|utc| utc.with_timezone(&Local).format("%M:%S").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}
