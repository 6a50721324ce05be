use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::session::WorkoutSession;

use super::loop_worker::sensing_loop;
use super::sources::{MotionSource, PositionSource};

/// Which sources came up for the current segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub position: bool,
    pub motion: bool,
}

pub struct SensingController {
    position: Arc<dyn PositionSource>,
    motion: Arc<dyn MotionSource>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SensingController {
    pub fn new(position: Arc<dyn PositionSource>, motion: Arc<dyn MotionSource>) -> Self {
        Self {
            position,
            motion,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Starts both sources and the loop feeding `session`. A source that
    /// fails to start is reported as missing rather than failing the call.
    pub async fn start_sensing(
        &mut self,
        session: Arc<Mutex<WorkoutSession>>,
    ) -> Result<Capabilities> {
        if self.handle.is_some() {
            bail!("sensing already active");
        }

        let fixes = if self.position.is_available() {
            match self.position.start_updates() {
                Ok(rx) => Some(rx),
                Err(err) => {
                    warn!("position updates failed to start: {err:#}");
                    None
                }
            }
        } else {
            warn!("position source unavailable; falling back to motion data");
            None
        };

        let motion = if self.motion.is_available() {
            match self.motion.start_updates() {
                Ok(rx) => Some(rx),
                Err(err) => {
                    warn!("motion updates failed to start: {err:#}");
                    None
                }
            }
        } else {
            info!("motion source unavailable");
            None
        };

        let capabilities = Capabilities {
            position: fixes.is_some(),
            motion: motion.is_some(),
        };

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sensing_loop(session, fixes, motion, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(capabilities)
    }

    /// Stops the sources, then cancels and joins the loop. Must not be
    /// called while holding the session lock.
    pub async fn stop_sensing(&mut self) -> Result<()> {
        self.position.stop_updates();
        self.motion.stop_updates();

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle.await.context("sensing loop task failed to join")
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::{
        models::{MotionSample, PositionFix, Wgs84Position},
        sensing::{ChannelMotionSource, ChannelPositionSource},
        session::CountingPermitProvider,
        settings::TrackerSettings,
    };

    fn session() -> Arc<Mutex<WorkoutSession>> {
        let settings = TrackerSettings::default();
        Arc::new(Mutex::new(WorkoutSession::new(
            &settings,
            Arc::new(CountingPermitProvider::new()),
        )))
    }

    async fn wait_for<F>(session: &Arc<Mutex<WorkoutSession>>, mut done: F)
    where
        F: FnMut(&mut WorkoutSession) -> bool,
    {
        for _ in 0..200 {
            if done(&mut *session.lock().await) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn applies_fixes_until_stopped() {
        let (position_feed, position) = ChannelPositionSource::new("position");
        let (_motion_feed, motion) = ChannelMotionSource::new("motion");
        let mut sensing = SensingController::new(Arc::new(position), Arc::new(motion));
        let session = session();
        session.lock().await.start(Utc::now());

        let capabilities = sensing.start_sensing(session.clone()).await.unwrap();
        assert_eq!(
            capabilities,
            Capabilities {
                position: true,
                motion: true
            }
        );
        assert!(sensing.start_sensing(session.clone()).await.is_err());

        assert!(position_feed.push(PositionFix {
            position: Wgs84Position::new(48.0, 2.0),
            speed_mps: 3.0,
            timestamp: Utc::now(),
        }));
        wait_for(&session, |s| s.route().len() == 1).await;

        sensing.stop_sensing().await.unwrap();
        assert!(!sensing.is_running());
        assert!(!position_feed.push(PositionFix {
            position: Wgs84Position::new(48.1, 2.0),
            speed_mps: 3.0,
            timestamp: Utc::now(),
        }));
    }

    #[tokio::test]
    async fn reports_missing_position_source() {
        let position = ChannelPositionSource::unavailable("position");
        let (motion_feed, motion) = ChannelMotionSource::new("motion");
        let mut sensing = SensingController::new(Arc::new(position), Arc::new(motion));
        let session = session();
        session.lock().await.start(Utc::now());

        let capabilities = sensing.start_sensing(session.clone()).await.unwrap();
        assert!(!capabilities.position);
        assert!(capabilities.motion);
        session
            .lock()
            .await
            .set_capabilities(capabilities.position, capabilities.motion);

        assert!(motion_feed.push(MotionSample {
            cumulative_distance_m: 400.0,
            current_pace_s_per_m: Some(0.2),
        }));
        wait_for(&session, |s| {
            s.tick();
            (s.metrics().distance - 0.4).abs() < 1e-9
        })
        .await;
        assert!((session.lock().await.metrics().current_speed - 18.0).abs() < 1e-9);

        sensing.stop_sensing().await.unwrap();
    }
}
