use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{bail, Result};
use log::{debug, warn};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::models::{MotionSample, PositionFix};

const SUBSCRIBER_CAPACITY: usize = 256;

/// Delivers raw position fixes between `start_updates` and `stop_updates`.
pub trait PositionSource: Send + Sync {
    fn is_available(&self) -> bool;
    fn start_updates(&self) -> Result<mpsc::Receiver<PositionFix>>;
    fn stop_updates(&self);
}

/// Delivers motion-coprocessor samples. `cumulative_distance_m` counts from
/// the latest `start_updates`.
pub trait MotionSource: Send + Sync {
    fn is_available(&self) -> bool;
    fn start_updates(&self) -> Result<mpsc::Receiver<MotionSample>>;
    fn stop_updates(&self);
}

type Subscriber<T> = Arc<Mutex<Option<mpsc::Sender<T>>>>;

/// Source fed by an external producer through a [`SourceFeed`]. Items pushed
/// while updates are stopped are dropped, as a hardware source would.
pub struct ChannelSource<T> {
    name: &'static str,
    available: bool,
    subscriber: Subscriber<T>,
}

pub type ChannelPositionSource = ChannelSource<PositionFix>;
pub type ChannelMotionSource = ChannelSource<MotionSample>;

/// Producer half of a [`ChannelSource`].
pub struct SourceFeed<T> {
    name: &'static str,
    subscriber: Subscriber<T>,
}

impl<T> Clone for SourceFeed<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            subscriber: self.subscriber.clone(),
        }
    }
}

impl<T: Send + 'static> ChannelSource<T> {
    pub fn new(name: &'static str) -> (SourceFeed<T>, Self) {
        let subscriber: Subscriber<T> = Arc::new(Mutex::new(None));
        (
            SourceFeed {
                name,
                subscriber: subscriber.clone(),
            },
            Self {
                name,
                available: true,
                subscriber,
            },
        )
    }

    /// A source whose capability is missing (no hardware, permission denied).
    pub fn unavailable(name: &'static str) -> Self {
        Self {
            name,
            available: false,
            subscriber: Arc::new(Mutex::new(None)),
        }
    }

    fn subscribe(&self) -> Result<mpsc::Receiver<T>> {
        if !self.available {
            bail!("{} source unavailable", self.name);
        }
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let previous = self
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(tx);
        if previous.is_some() {
            debug!("{} source restarted while running", self.name);
        }
        Ok(rx)
    }

    fn unsubscribe(&self) {
        self.subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl<T> SourceFeed<T> {
    /// Hands one item to the running subscriber. Returns `false` when
    /// updates are stopped or the subscriber is backed up.
    pub fn push(&self, item: T) -> bool {
        let guard = self
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            debug!("{} update dropped: updates stopped", self.name);
            return false;
        };
        match tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("{} update dropped: consumer backed up", self.name);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("{} update dropped: consumer gone", self.name);
                false
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl PositionSource for ChannelSource<PositionFix> {
    fn is_available(&self) -> bool {
        self.available
    }

    fn start_updates(&self) -> Result<mpsc::Receiver<PositionFix>> {
        self.subscribe()
    }

    fn stop_updates(&self) {
        self.unsubscribe();
    }
}

impl MotionSource for ChannelSource<MotionSample> {
    fn is_available(&self) -> bool {
        self.available
    }

    fn start_updates(&self) -> Result<mpsc::Receiver<MotionSample>> {
        self.subscribe()
    }

    fn stop_updates(&self) {
        self.unsubscribe();
    }
}
