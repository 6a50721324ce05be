use std::sync::Arc;

use log::{debug, info};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::models::{MotionSample, PositionFix};
use crate::session::WorkoutSession;

enum SensorEvent {
    Fix(Option<PositionFix>),
    Motion(Option<MotionSample>),
}

/// Applies every fix and motion sample to the session until cancelled. A
/// stream that closes is dropped from the select; the loop keeps serving the
/// other one.
pub async fn sensing_loop(
    session: Arc<Mutex<WorkoutSession>>,
    mut fixes: Option<mpsc::Receiver<PositionFix>>,
    mut motion: Option<mpsc::Receiver<MotionSample>>,
    cancel_token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                info!("sensing loop shutting down");
                break;
            }
            fix = next_event(&mut fixes) => SensorEvent::Fix(fix),
            sample = next_event(&mut motion) => SensorEvent::Motion(sample),
        };

        match event {
            SensorEvent::Fix(Some(fix)) => {
                session.lock().await.ingest_fix(fix);
            }
            SensorEvent::Fix(None) => {
                debug!("position stream closed");
                fixes = None;
            }
            SensorEvent::Motion(Some(sample)) => {
                session.lock().await.ingest_motion(sample);
            }
            SensorEvent::Motion(None) => {
                debug!("motion stream closed");
                motion = None;
            }
        }
    }
}

async fn next_event<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
