use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::models::{Metrics, Vitals};

/// Discrete update published by a signal producer and consumed by the
/// aggregator at tick time. Distances are kilometers since the current
/// segment opened; speeds are km/h.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalUpdate {
    Position { distance: f64, speed: f64 },
    Motion { distance: f64, speed: f64 },
    Vitals(Vitals),
}

#[derive(Debug, Clone, Copy, Default)]
struct Reading {
    distance: f64,
    speed: f64,
}

/// Folds queued signal updates into the live [`Metrics`] once per tick.
pub struct MetricsAggregator {
    inbox: UnboundedReceiver<SignalUpdate>,
    tick: Duration,
    position_active: bool,
    position: Reading,
    motion: Reading,
    vitals: Vitals,
}

impl MetricsAggregator {
    pub fn new(inbox: UnboundedReceiver<SignalUpdate>, tick: Duration) -> Self {
        Self {
            inbox,
            tick,
            position_active: true,
            position: Reading::default(),
            motion: Reading::default(),
            vitals: Vitals::default(),
        }
    }

    pub fn tick_length(&self) -> Duration {
        self.tick
    }

    /// Chooses the distance source: the position tracker while the position
    /// source runs, otherwise the motion fallback.
    pub fn set_position_active(&mut self, active: bool) {
        self.position_active = active;
    }

    pub fn position_active(&self) -> bool {
        self.position_active
    }

    /// Advances workout time by one tick and merges everything queued.
    pub fn tick(&mut self, metrics: &mut Metrics, accumulated_distance: f64) {
        self.drain();
        metrics.workout_time += self.tick;
        self.merge(metrics, accumulated_distance);
    }

    /// Merges everything queued without advancing time. Used right before a
    /// segment is frozen.
    pub fn sync(&mut self, metrics: &mut Metrics, accumulated_distance: f64) {
        self.drain();
        self.merge(metrics, accumulated_distance);
    }

    /// Discards stale source readings so a new segment starts from zero.
    /// Queued vitals are kept.
    pub fn begin_segment(&mut self) {
        while let Ok(update) = self.inbox.try_recv() {
            if let SignalUpdate::Vitals(vitals) = update {
                self.vitals = vitals;
            }
        }
        self.position = Reading::default();
        self.motion = Reading::default();
    }

    pub fn reset(&mut self) {
        while self.inbox.try_recv().is_ok() {}
        self.position = Reading::default();
        self.motion = Reading::default();
        self.vitals = Vitals::default();
    }

    fn drain(&mut self) {
        while let Ok(update) = self.inbox.try_recv() {
            match update {
                SignalUpdate::Position { distance, speed } => {
                    self.position = Reading { distance, speed };
                }
                SignalUpdate::Motion { distance, speed } => {
                    self.motion = Reading { distance, speed };
                }
                SignalUpdate::Vitals(vitals) => self.vitals = vitals,
            }
        }
    }

    fn merge(&self, metrics: &mut Metrics, accumulated_distance: f64) {
        let source = if self.position_active {
            self.position
        } else {
            self.motion
        };
        metrics.distance = accumulated_distance + source.distance;
        metrics.current_speed = source.speed;
        metrics.heart_rate = self.vitals.heart_rate;
        metrics.calories = self.vitals.calories;
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::unbounded_channel;

    use super::*;

    #[test]
    fn tick_advances_time_and_adds_accumulated_distance() {
        let (tx, rx) = unbounded_channel();
        let mut aggregator = MetricsAggregator::new(rx, Duration::from_secs(1));
        let mut metrics = Metrics::new();

        tx.send(SignalUpdate::Position {
            distance: 0.25,
            speed: 18.0,
        })
        .unwrap();
        aggregator.tick(&mut metrics, 2.0);

        assert_eq!(metrics.workout_time, aggregator.tick_length());
        assert_eq!(metrics.workout_time, Duration::from_secs(1));
        assert!((metrics.distance - 2.25).abs() < 1e-12);
        assert_eq!(metrics.current_speed, 18.0);
    }

    #[test]
    fn latest_update_wins_within_a_tick() {
        let (tx, rx) = unbounded_channel();
        let mut aggregator = MetricsAggregator::new(rx, Duration::from_secs(1));
        let mut metrics = Metrics::new();

        for step in 1..=3 {
            tx.send(SignalUpdate::Position {
                distance: step as f64 * 0.01,
                speed: 10.0 + step as f64,
            })
            .unwrap();
        }
        aggregator.tick(&mut metrics, 0.0);

        assert!((metrics.distance - 0.03).abs() < 1e-12);
        assert_eq!(metrics.current_speed, 13.0);
    }

    #[test]
    fn falls_back_to_motion_when_position_inactive() {
        let (tx, rx) = unbounded_channel();
        let mut aggregator = MetricsAggregator::new(rx, Duration::from_secs(1));
        let mut metrics = Metrics::new();
        aggregator.set_position_active(false);

        tx.send(SignalUpdate::Position {
            distance: 5.0,
            speed: 30.0,
        })
        .unwrap();
        tx.send(SignalUpdate::Motion {
            distance: 0.4,
            speed: 12.0,
        })
        .unwrap();
        aggregator.tick(&mut metrics, 1.0);

        assert!((metrics.distance - 1.4).abs() < 1e-12);
        assert_eq!(metrics.current_speed, 12.0);
    }

    #[test]
    fn carries_vitals_through() {
        let (tx, rx) = unbounded_channel();
        let mut aggregator = MetricsAggregator::new(rx, Duration::from_secs(1));
        let mut metrics = Metrics::new();

        tx.send(SignalUpdate::Vitals(Vitals {
            heart_rate: 142,
            calories: 12.5,
        }))
        .unwrap();
        aggregator.sync(&mut metrics, 0.0);

        assert_eq!(metrics.heart_rate, 142);
        assert_eq!(metrics.calories, 12.5);
        assert_eq!(metrics.workout_time, Duration::ZERO);
    }

    #[test]
    fn begin_segment_discards_stale_distance() {
        let (tx, rx) = unbounded_channel();
        let mut aggregator = MetricsAggregator::new(rx, Duration::from_secs(1));
        let mut metrics = Metrics::new();

        tx.send(SignalUpdate::Position {
            distance: 3.0,
            speed: 20.0,
        })
        .unwrap();
        aggregator.begin_segment();
        aggregator.tick(&mut metrics, 3.0);

        assert!((metrics.distance - 3.0).abs() < 1e-12);
        assert_eq!(metrics.current_speed, 0.0);
    }
}
