use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A position as reported by the receiver, in the WGS-84 frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wgs84Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Wgs84Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A position in the GCJ-02 frame used for route rendering.
///
/// Only produced by [`crate::location::wgs84_to_gcj02`]; positions outside the
/// correction zone carry their WGS-84 values unchanged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Gcj02Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Gcj02Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

/// One raw fix from the position source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionFix {
    pub position: Wgs84Position,
    /// Instantaneous speed in m/s. Receivers report negative values when the
    /// speed is unknown.
    pub speed_mps: f64,
    pub timestamp: DateTime<Utc>,
}

/// One update from the motion coprocessor (pedometer-style distance estimate).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MotionSample {
    /// Distance in meters since motion updates were started.
    pub cumulative_distance_m: f64,
    pub current_pace_s_per_m: Option<f64>,
}

/// Heart rate and calorie estimate supplied by an external collaborator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    pub heart_rate: u32,
    /// Calories burned since the session started, in kcal.
    pub calories: f64,
}
