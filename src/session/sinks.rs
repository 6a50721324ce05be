use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::SessionSummary;

/// Durable storage for finished sessions. A summary whose `date` matches a
/// stored one replaces it.
#[async_trait]
pub trait SummarySink: Send + Sync {
    async fn save_summary(&self, summary: &SessionSummary) -> Result<()>;
}

/// External fitness repository. Writes are best-effort; callers log
/// failures and move on.
#[async_trait]
pub trait FitnessRecordSink: Send + Sync {
    async fn save_workout(
        &self,
        distance_m: f64,
        duration: Duration,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<()>;

    async fn save_distance(&self, distance_m: f64, date: DateTime<Utc>) -> Result<()>;
}

/// Fitness-record view of a finished session: meters, total riding time,
/// and the span from the first segment start to the end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkoutEntry {
    pub distance_m: f64,
    pub duration: Duration,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl From<&SessionSummary> for WorkoutEntry {
    fn from(summary: &SessionSummary) -> Self {
        Self {
            distance_m: summary.total_distance * 1000.0,
            duration: summary.total_duration,
            start_date: summary.started_at.unwrap_or(summary.date),
            end_date: summary.date,
        }
    }
}
