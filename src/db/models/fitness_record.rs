use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FitnessKind {
    Workout,
    Distance,
}

impl FitnessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessKind::Workout => "workout",
            FitnessKind::Distance => "distance",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "workout" => Ok(FitnessKind::Workout),
            "distance" => Ok(FitnessKind::Distance),
            other => Err(anyhow!("unknown fitness record kind {other}")),
        }
    }
}

/// One entry written through the fitness-record sink. Distance records
/// have no duration and share start and end date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FitnessRecord {
    pub id: i64,
    pub kind: FitnessKind,
    pub distance_m: f64,
    pub duration: Option<Duration>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}
