use log::debug;
use tokio::sync::mpsc::UnboundedSender;

use crate::models::MotionSample;
use crate::session::SignalUpdate;

/// Converts motion-coprocessor samples into the fallback distance/speed
/// signal.
pub struct MotionTracker {
    updates: UnboundedSender<SignalUpdate>,
    active: bool,
}

impl MotionTracker {
    pub fn new(updates: UnboundedSender<SignalUpdate>) -> Self {
        Self {
            updates,
            active: false,
        }
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn ingest(&mut self, sample: MotionSample) -> bool {
        if !self.active {
            debug!("dropping motion sample received after motion updates stopped");
            return false;
        }

        let update = SignalUpdate::Motion {
            distance: sample.cumulative_distance_m.max(0.0) / 1000.0,
            speed: pace_to_speed(sample.current_pace_s_per_m),
        };
        if self.updates.send(update).is_err() {
            debug!("metrics aggregator gone; motion update discarded");
        }
        true
    }
}

/// Pace in s/m to km/h. Missing or non-positive pace reads as standing still.
pub fn pace_to_speed(pace_s_per_m: Option<f64>) -> f64 {
    match pace_s_per_m {
        Some(pace) if pace > 0.0 && pace.is_finite() => 3.6 / pace,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::unbounded_channel;

    use super::*;

    #[test]
    fn converts_pace_to_kmh() {
        assert!((pace_to_speed(Some(0.2)) - 18.0).abs() < 1e-9);
        assert_eq!(pace_to_speed(Some(0.0)), 0.0);
        assert_eq!(pace_to_speed(None), 0.0);
    }

    #[test]
    fn publishes_kilometers_while_active() {
        let (tx, mut rx) = unbounded_channel();
        let mut motion = MotionTracker::new(tx);

        assert!(!motion.ingest(MotionSample {
            cumulative_distance_m: 10.0,
            current_pace_s_per_m: None,
        }));

        assert!(!motion.is_active());
        motion.start();
        assert!(motion.is_active());
        assert!(motion.ingest(MotionSample {
            cumulative_distance_m: 1500.0,
            current_pace_s_per_m: Some(0.36),
        }));

        match rx.try_recv() {
            Ok(SignalUpdate::Motion { distance, speed }) => {
                assert!((distance - 1.5).abs() < 1e-9);
                assert!((speed - 10.0).abs() < 1e-9);
            }
            other => panic!("unexpected update {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }
}
