use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Live metrics of the running session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub workout_time: Duration,
    /// Kilometers since the session started, across all segments.
    pub distance: f64,
    /// km/h
    pub current_speed: f64,
    pub heart_rate: u32,
    /// kcal
    pub calories: f64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}
