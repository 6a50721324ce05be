use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::{error, info, warn};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};

use crate::{
    models::{SessionSummary, Vitals},
    sensing::{MotionSource, PositionSource, SensingController},
    settings::TrackerSettings,
};

use super::{
    permit::BackgroundPermitProvider,
    sinks::{FitnessRecordSink, SummarySink, WorkoutEntry},
    state::{SessionEvent, SessionState},
    workout::{SessionSnapshot, TransitionOutcome, WorkoutSession},
};

/// Collaborators handed to the controller at construction.
pub struct SessionDeps {
    pub settings: TrackerSettings,
    pub permits: Arc<dyn BackgroundPermitProvider>,
    pub position: Arc<dyn PositionSource>,
    pub motion: Arc<dyn MotionSource>,
    pub summaries: Arc<dyn SummarySink>,
    pub fitness: Option<Arc<dyn FitnessRecordSink>>,
}

#[derive(Debug, Clone)]
pub struct SessionEnded {
    pub summary: SessionSummary,
    /// `false` when the summary sink rejected the save.
    pub persisted: bool,
}

#[derive(Clone)]
pub struct SessionController {
    session: Arc<Mutex<WorkoutSession>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    sensing: Arc<Mutex<SensingController>>,
    transitions: Arc<Mutex<()>>,
    summaries: Arc<dyn SummarySink>,
    fitness: Option<Arc<dyn FitnessRecordSink>>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    tick_interval: Duration,
    publish_every_ticks: u32,
}

impl SessionController {
    pub fn new(deps: SessionDeps) -> Self {
        let session = WorkoutSession::new(&deps.settings, deps.permits);
        let (snapshots, _) = watch::channel(session.snapshot());

        Self {
            session: Arc::new(Mutex::new(session)),
            ticker: Arc::new(Mutex::new(None)),
            sensing: Arc::new(Mutex::new(SensingController::new(deps.position, deps.motion))),
            transitions: Arc::new(Mutex::new(())),
            summaries: deps.summaries,
            fitness: deps.fitness,
            snapshots: Arc::new(snapshots),
            tick_interval: deps.settings.tick_interval(),
            publish_every_ticks: deps.settings.publish_every_ticks.max(1),
        }
    }

    pub async fn start(&self) -> SessionState {
        self.apply(SessionEvent::Start).await.state
    }

    pub async fn pause(&self) -> SessionState {
        self.apply(SessionEvent::Pause).await.state
    }

    pub async fn resume(&self) -> SessionState {
        self.apply(SessionEvent::Resume).await.state
    }

    /// Ends the session and hands the summary to the sinks. `None` when
    /// there was no session to end.
    pub async fn end(&self) -> Option<SessionEnded> {
        let summary = self.apply(SessionEvent::End).await.summary?;

        let persisted = match self.summaries.save_summary(&summary).await {
            Ok(()) => true,
            Err(err) => {
                error!("failed to persist session summary {}: {err:#}", summary.id);
                false
            }
        };
        self.record_fitness(&summary);

        Some(SessionEnded { summary, persisted })
    }

    pub async fn record_vitals(&self, vitals: Vitals) -> bool {
        self.session.lock().await.record_vitals(vitals)
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Live snapshots, published on every transition and every
    /// `publish_every_ticks` ticks.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    async fn apply(&self, event: SessionEvent) -> TransitionOutcome {
        let _transition = self.transitions.lock().await;

        let outcome = self.session.lock().await.handle(event, Utc::now());

        if outcome.transition.stops_recording() {
            self.stop_recording().await;
        }
        if outcome.transition.opens_segment() {
            self.begin_recording().await;
        }
        if outcome.transition.opens_segment() || outcome.transition.stops_recording() {
            self.publish().await;
        }

        outcome
    }

    async fn begin_recording(&self) {
        let generation = self.session.lock().await.generation();

        let started = self
            .sensing
            .lock()
            .await
            .start_sensing(self.session.clone())
            .await;
        let capabilities = match started {
            Ok(capabilities) => capabilities,
            Err(err) => {
                error!("failed to start sensing: {err:#}");
                return self.spawn_ticker(generation).await;
            }
        };
        self.session
            .lock()
            .await
            .set_capabilities(capabilities.position, capabilities.motion);

        self.spawn_ticker(generation).await;
    }

    async fn stop_recording(&self) {
        self.cancel_ticker().await;
        if let Err(err) = self.sensing.lock().await.stop_sensing().await {
            error!("failed to stop sensing: {err:#}");
        }
    }

    async fn spawn_ticker(&self, generation: u64) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let session = self.session.clone();
        let snapshots = self.snapshots.clone();
        let tick_interval = self.tick_interval;
        let publish_every = self.publish_every_ticks;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            let mut ticks: u32 = 0;
            loop {
                interval.tick().await;

                let snapshot = {
                    let mut guard = session.lock().await;
                    if !guard.tick_for(generation) {
                        break;
                    }
                    ticks = ticks.wrapping_add(1);
                    if ticks % publish_every != 0 {
                        continue;
                    }
                    guard.snapshot()
                };

                snapshots.send_replace(snapshot);
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    async fn publish(&self) {
        let snapshot = self.session.lock().await.snapshot();
        self.snapshots.send_replace(snapshot);
    }

    fn record_fitness(&self, summary: &SessionSummary) {
        let Some(fitness) = self.fitness.clone() else {
            return;
        };

        let entry = WorkoutEntry::from(summary);

        let workout_sink = fitness.clone();
        tokio::spawn(async move {
            match workout_sink
                .save_workout(entry.distance_m, entry.duration, entry.start_date, entry.end_date)
                .await
            {
                Ok(()) => info!("workout record saved ({:.0} m)", entry.distance_m),
                Err(err) => warn!("failed to save workout record: {err:#}"),
            }
        });

        tokio::spawn(async move {
            if let Err(err) = fitness.save_distance(entry.distance_m, entry.end_date).await {
                warn!("failed to save distance record: {err:#}");
            }
        });
    }
}
