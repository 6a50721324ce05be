use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Gcj02Position, Metrics, Segment, SessionSummary};

#[derive(Debug, Clone, Copy)]
struct OpenSegment {
    start_time: DateTime<Utc>,
    workout_time_at_start: Duration,
    calories_at_start: f64,
}

/// Closed segments of the current session, most recent first, plus the
/// marker of the segment being recorded.
#[derive(Debug, Default)]
pub struct SegmentRecorder {
    segments: Vec<Segment>,
    open: Option<OpenSegment>,
}

impl SegmentRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, start_time: DateTime<Utc>, metrics: &Metrics) {
        self.open = Some(OpenSegment {
            start_time,
            workout_time_at_start: metrics.workout_time,
            calories_at_start: metrics.calories,
        });
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Freezes the open segment against `metrics` and prepends it. Does
    /// nothing when no segment is open.
    pub fn save_segment(&mut self, metrics: &Metrics, accumulated_distance: f64) -> Option<&Segment> {
        let open = self.open.take()?;

        let duration = metrics.workout_time.saturating_sub(open.workout_time_at_start);
        let distance = (metrics.distance - accumulated_distance).max(0.0);
        let hours = duration.as_secs_f64() / 3600.0;
        let average_speed = if hours > 0.0 { distance / hours } else { 0.0 };

        self.segments.insert(
            0,
            Segment {
                start_time: open.start_time,
                duration,
                distance,
                average_speed,
                average_heart_rate: metrics.heart_rate,
                calories: (metrics.calories - open.calories_at_start).max(0.0),
            },
        );
        self.segments.first()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn total_distance(&self) -> f64 {
        self.segments.iter().map(|segment| segment.distance).sum()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.open = None;
    }
}

/// Reduces the segment list into one summary using duration-weighted
/// averages. An empty or zero-length session yields zero averages.
pub fn calculate_session_summary(
    segments: &[Segment],
    route_coordinates: Vec<Gcj02Position>,
    date: DateTime<Utc>,
) -> SessionSummary {
    let total_duration: Duration = segments.iter().map(|segment| segment.duration).sum();
    let total_distance: f64 = segments.iter().map(|segment| segment.distance).sum();
    let total_calories: f64 = segments.iter().map(|segment| segment.calories).sum();

    let total_secs = total_duration.as_secs_f64();
    let (average_speed, average_heart_rate) = if total_secs > 0.0 {
        let weighted_speed: f64 = segments
            .iter()
            .map(|segment| segment.average_speed * segment.duration_secs())
            .sum();
        let weighted_heart_rate: f64 = segments
            .iter()
            .map(|segment| f64::from(segment.average_heart_rate) * segment.duration_secs())
            .sum();
        (
            weighted_speed / total_secs,
            (weighted_heart_rate / total_secs).floor() as u32,
        )
    } else {
        (0.0, 0)
    };

    SessionSummary {
        id: Uuid::new_v4(),
        date,
        started_at: segments.iter().map(|segment| segment.start_time).min(),
        total_distance,
        total_duration,
        average_speed,
        average_heart_rate,
        total_calories,
        segments: segments.to_vec(),
        route_coordinates,
    }
}
