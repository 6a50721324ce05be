use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Gcj02Position, Segment};

/// Reduced record of a finished session, handed to the persistence sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    /// When the session ended. Stored summaries are keyed by this value.
    pub date: DateTime<Utc>,
    /// Start of the earliest segment, if any segment was recorded.
    pub started_at: Option<DateTime<Utc>>,
    pub total_distance: f64,
    pub total_duration: Duration,
    pub average_speed: f64,
    pub average_heart_rate: u32,
    pub total_calories: f64,
    /// Most recent segment first.
    pub segments: Vec<Segment>,
    pub route_coordinates: Vec<Gcj02Position>,
}

/// Row shape used by session listings; omits segments and route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub total_distance: f64,
    pub total_duration: Duration,
    pub average_speed: f64,
    pub total_calories: f64,
    pub segment_count: usize,
}

impl From<&SessionSummary> for SessionInfo {
    fn from(summary: &SessionSummary) -> Self {
        Self {
            id: summary.id,
            date: summary.date,
            total_distance: summary.total_distance,
            total_duration: summary.total_duration,
            average_speed: summary.average_speed,
            total_calories: summary.total_calories,
            segment_count: summary.segments.len(),
        }
    }
}
