use geo::{Distance, Haversine};
use log::debug;
use tokio::sync::mpsc::UnboundedSender;

use crate::models::{Gcj02Position, PositionFix};
use crate::session::SignalUpdate;

use super::{converter::wgs84_to_gcj02, route::RouteBuffer};

/// Turns raw fixes into converted route points, a per-segment distance and
/// the current speed. Every accepted fix publishes one
/// [`SignalUpdate::Position`].
pub struct LocationTracker {
    updates: UnboundedSender<SignalUpdate>,
    route: RouteBuffer,
    location: Option<Gcj02Position>,
    last_accepted: Option<Gcj02Position>,
    /// Kilometers since the last `start_tracking`.
    distance: f64,
    /// km/h
    speed: f64,
    tracking: bool,
    min_fix_distance_m: f64,
}

impl LocationTracker {
    pub fn new(
        updates: UnboundedSender<SignalUpdate>,
        route_capacity: usize,
        min_fix_distance_m: f64,
    ) -> Self {
        Self {
            updates,
            route: RouteBuffer::with_capacity(route_capacity),
            location: None,
            last_accepted: None,
            distance: 0.0,
            speed: 0.0,
            tracking: false,
            min_fix_distance_m: min_fix_distance_m.max(0.0),
        }
    }

    pub fn start_tracking(&mut self) {
        self.tracking = true;
        self.distance = 0.0;
        self.last_accepted = None;
    }

    /// Stops ingestion. Accumulators are left as they are.
    pub fn stop_tracking(&mut self) {
        self.tracking = false;
    }

    pub fn reset_tracking(&mut self) {
        self.distance = 0.0;
        self.speed = 0.0;
        self.last_accepted = None;
        self.location = None;
        self.route.clear();
    }

    /// Applies one fix. Returns `false` when the fix arrived while tracking
    /// was stopped and was dropped.
    pub fn ingest(&mut self, fix: PositionFix) -> bool {
        if !self.tracking {
            debug!("dropping position fix received after tracking stopped");
            return false;
        }

        let converted = wgs84_to_gcj02(fix.position);
        self.location = Some(converted);
        self.speed = (fix.speed_mps * 3.6).max(0.0);

        let moved = match self.last_accepted {
            Some(previous) => {
                let meters = Haversine::distance(previous.to_point(), converted.to_point());
                if meters < self.min_fix_distance_m {
                    None
                } else {
                    Some(meters)
                }
            }
            None => Some(0.0),
        };

        if let Some(meters) = moved {
            self.distance += meters / 1000.0;
            self.route.push(converted);
            self.last_accepted = Some(converted);
        }

        self.publish();
        true
    }

    fn publish(&self) {
        let update = SignalUpdate::Position {
            distance: self.distance,
            speed: self.speed,
        };
        if self.updates.send(update).is_err() {
            debug!("metrics aggregator gone; position update discarded");
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn location(&self) -> Option<Gcj02Position> {
        self.location
    }

    pub fn route(&self) -> &RouteBuffer {
        &self.route
    }
}
