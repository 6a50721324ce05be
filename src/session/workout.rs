use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use crate::{
    format::format_duration,
    location::{LocationTracker, RouteBuffer},
    models::{Gcj02Position, Metrics, MotionSample, PositionFix, Segment, SessionSummary, Vitals},
    sensing::MotionTracker,
    settings::{PausedStartPolicy, TrackerSettings},
};

use super::{
    aggregator::{MetricsAggregator, SignalUpdate},
    permit::{BackgroundPermit, BackgroundPermitProvider},
    recorder::{calculate_session_summary, SegmentRecorder},
    state::{SessionEvent, SessionState, Transition},
};

const PERMIT_NAME: &str = "ridelog-session";

/// Read-only view for the live display.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub metrics: Metrics,
    pub segments: Vec<Segment>,
    pub location: Option<Gcj02Position>,
    pub route_points: usize,
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub event: SessionEvent,
    pub previous: SessionState,
    pub transition: Transition,
    pub state: SessionState,
    /// Present exactly when the transition ended the session.
    pub summary: Option<SessionSummary>,
}

/// One session: lifecycle, live metrics, segments and route.
///
/// Not thread-safe on its own; the controller keeps it behind a single mutex
/// so ticks, fixes and transitions never interleave.
pub struct WorkoutSession {
    state: SessionState,
    metrics: Metrics,
    accumulated_distance: f64,
    aggregator: MetricsAggregator,
    tracker: LocationTracker,
    motion: MotionTracker,
    recorder: SegmentRecorder,
    vitals_tx: UnboundedSender<SignalUpdate>,
    permits: Arc<dyn BackgroundPermitProvider>,
    permit: Option<BackgroundPermit>,
    /// Bumped whenever a segment opens or closes; tickers bound to an older
    /// generation stop applying.
    generation: u64,
    paused_start_policy: PausedStartPolicy,
    position_available: bool,
    motion_available: bool,
    debug_ticks: bool,
}

impl WorkoutSession {
    pub fn new(settings: &TrackerSettings, permits: Arc<dyn BackgroundPermitProvider>) -> Self {
        let (updates_tx, updates_rx) = unbounded_channel();

        Self {
            state: SessionState::NotStarted,
            metrics: Metrics::new(),
            accumulated_distance: 0.0,
            aggregator: MetricsAggregator::new(updates_rx, settings.tick_interval()),
            tracker: LocationTracker::new(
                updates_tx.clone(),
                settings.route_capacity,
                settings.min_fix_distance_m,
            ),
            motion: MotionTracker::new(updates_tx.clone()),
            recorder: SegmentRecorder::new(),
            vitals_tx: updates_tx,
            permits,
            permit: None,
            generation: 0,
            paused_start_policy: settings.paused_start_policy,
            position_available: true,
            motion_available: true,
            debug_ticks: settings.debug_ticks,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn segments(&self) -> &[Segment] {
        self.recorder.segments()
    }

    pub fn accumulated_distance(&self) -> f64 {
        self.accumulated_distance
    }

    pub fn route(&self) -> &RouteBuffer {
        self.tracker.route()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn holds_permit(&self) -> bool {
        self.permit.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            metrics: self.metrics,
            segments: self.recorder.segments().to_vec(),
            location: self.tracker.location(),
            route_points: self.tracker.route().len(),
        }
    }

    /// Records which signal sources came up for the current segment. Without
    /// a position source, distance and speed come from the motion fallback.
    pub fn set_capabilities(&mut self, position: bool, motion: bool) {
        self.position_available = position;
        self.motion_available = motion;
        self.aggregator.set_position_active(position);

        let active = self.state == SessionState::Active;
        if !position {
            self.tracker.stop_tracking();
        } else if active && !self.tracker.is_tracking() {
            self.tracker.start_tracking();
        }
        if !motion {
            self.motion.stop();
        } else if active && !self.motion.is_active() {
            self.motion.start();
        }
        if !position && !motion {
            warn!("no distance source available; distance will stay at zero");
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> TransitionOutcome {
        self.handle(SessionEvent::Start, now)
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> TransitionOutcome {
        self.handle(SessionEvent::Pause, now)
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> TransitionOutcome {
        self.handle(SessionEvent::Resume, now)
    }

    pub fn end(&mut self, now: DateTime<Utc>) -> TransitionOutcome {
        self.handle(SessionEvent::End, now)
    }

    pub fn handle(&mut self, event: SessionEvent, now: DateTime<Utc>) -> TransitionOutcome {
        let previous = self.state;
        let transition = previous.on(event);
        let mut summary = None;

        match transition {
            Transition::Ignore => {
                debug!("ignoring {event:?} while {previous:?}");
            }
            Transition::BeginSession => self.begin_session(now),
            Transition::RestartFromPaused => match self.paused_start_policy {
                PausedStartPolicy::Resume => self.open_segment(now),
                PausedStartPolicy::NewSession => {
                    warn!(
                        "start while paused: discarding {} unsaved segment(s)",
                        self.recorder.segments().len()
                    );
                    self.begin_session(now);
                }
            },
            Transition::PauseSegment => self.close_segment(),
            Transition::ResumeSegment => self.open_segment(now),
            Transition::FinishActive => {
                self.close_segment();
                summary = Some(self.finish(now));
            }
            Transition::FinishPaused => summary = Some(self.finish(now)),
        }

        self.state = transition.next_state(previous);
        if transition != Transition::Ignore {
            info!("session {previous:?} -> {:?} on {event:?}", self.state);
        }

        TransitionOutcome {
            event,
            previous,
            transition,
            state: self.state,
            summary,
        }
    }

    /// Applies one timer tick. Returns `false` when not recording, in which
    /// case nothing changes.
    pub fn tick(&mut self) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        self.aggregator.tick(&mut self.metrics, self.accumulated_distance);
        if self.debug_ticks {
            info!(
                "tick: time={} distance={:.3}km speed={:.1}km/h",
                format_duration(self.metrics.workout_time),
                self.metrics.distance,
                self.metrics.current_speed
            );
        }
        true
    }

    /// Tick issued by a ticker started for `generation`; stale tickers are
    /// refused.
    pub fn tick_for(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.tick()
    }

    pub fn ingest_fix(&mut self, fix: PositionFix) -> bool {
        self.tracker.ingest(fix)
    }

    pub fn ingest_motion(&mut self, sample: MotionSample) -> bool {
        self.motion.ingest(sample)
    }

    pub fn record_vitals(&mut self, vitals: Vitals) -> bool {
        if !self.state.is_recording() {
            debug!("dropping vitals outside a session");
            return false;
        }
        self.vitals_tx.send(SignalUpdate::Vitals(vitals)).is_ok()
    }

    fn begin_session(&mut self, now: DateTime<Utc>) {
        self.metrics = Metrics::new();
        self.accumulated_distance = 0.0;
        self.recorder.clear();
        self.tracker.reset_tracking();
        self.aggregator.reset();
        self.open_segment(now);
    }

    fn open_segment(&mut self, now: DateTime<Utc>) {
        self.generation += 1;
        // Vitals reported during the pause become the segment's baseline.
        self.aggregator.begin_segment();
        self.aggregator.set_position_active(self.position_available);
        self.aggregator.sync(&mut self.metrics, self.accumulated_distance);
        self.recorder.open(now, &self.metrics);

        if self.position_available {
            self.tracker.start_tracking();
        }
        if self.motion_available {
            self.motion.start();
        }

        if self.permit.is_none() {
            match BackgroundPermit::acquire(self.permits.clone(), PERMIT_NAME) {
                Ok(permit) => self.permit = Some(permit),
                Err(err) => warn!("background permit unavailable, recording in foreground only: {err:#}"),
            }
        }
    }

    /// Freezes the live metrics into a segment. Caller holds the only
    /// reference, so no tick or fix can land between the read and the close.
    fn close_segment(&mut self) {
        self.aggregator
            .sync(&mut self.metrics, self.accumulated_distance);
        if let Some(segment) = self
            .recorder
            .save_segment(&self.metrics, self.accumulated_distance)
        {
            debug!(
                "segment closed: {:.3}km in {}",
                segment.distance,
                format_duration(segment.duration)
            );
        }
        self.accumulated_distance = self.metrics.distance;
        self.suspend();
    }

    fn suspend(&mut self) {
        self.generation += 1;
        self.tracker.stop_tracking();
        self.motion.stop();
        self.metrics.current_speed = 0.0;
        self.permit = None;
    }

    fn finish(&mut self, now: DateTime<Utc>) -> SessionSummary {
        self.suspend();

        let summary =
            calculate_session_summary(self.recorder.segments(), self.tracker.route().to_vec(), now);
        info!(
            "session summary: distance={:.3}km duration={} avg_speed={:.1}km/h avg_hr={} calories={:.1}kcal route_points={}",
            summary.total_distance,
            format_duration(summary.total_duration),
            summary.average_speed,
            summary.average_heart_rate,
            summary.total_calories,
            summary.route_coordinates.len()
        );

        self.recorder.clear();
        self.metrics = Metrics::new();
        self.accumulated_distance = 0.0;
        self.tracker.reset_tracking();
        self.aggregator.reset();
        summary
    }
}
