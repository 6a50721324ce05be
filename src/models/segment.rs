use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A closed interval of riding between a start/resume and the next pause/end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    /// km covered within this segment only.
    pub distance: f64,
    /// km/h
    pub average_speed: f64,
    pub average_heart_rate: u32,
    /// kcal burned within this segment only.
    pub calories: f64,
}

impl Segment {
    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}
