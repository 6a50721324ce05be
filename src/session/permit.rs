//! Host capability that keeps the process running in the background while a
//! segment is being recorded.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use anyhow::Result;
use log::{debug, warn};

pub type PermitId = u64;

pub trait BackgroundPermitProvider: Send + Sync {
    fn begin(&self, name: &str) -> Result<PermitId>;
    fn end(&self, id: PermitId);
}

/// Held while recording. Dropping it ends the permit, so every exit path
/// releases it exactly once.
pub struct BackgroundPermit {
    id: PermitId,
    provider: Arc<dyn BackgroundPermitProvider>,
}

impl BackgroundPermit {
    pub fn acquire(provider: Arc<dyn BackgroundPermitProvider>, name: &str) -> Result<Self> {
        let id = provider.begin(name)?;
        debug!("background permit {id} acquired for {name}");
        Ok(Self { id, provider })
    }

    pub fn id(&self) -> PermitId {
        self.id
    }
}

impl Drop for BackgroundPermit {
    fn drop(&mut self) {
        self.provider.end(self.id);
        debug!("background permit {} released", self.id);
    }
}

impl std::fmt::Debug for BackgroundPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundPermit").field("id", &self.id).finish()
    }
}

/// In-process provider for hosts without a background-execution model.
/// Tracks outstanding permits and counts begin/end calls.
#[derive(Default)]
pub struct CountingPermitProvider {
    next_id: AtomicU64,
    outstanding: Mutex<HashSet<PermitId>>,
    begun: AtomicU64,
    ended: AtomicU64,
}

impl CountingPermitProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begun(&self) -> u64 {
        self.begun.load(Ordering::SeqCst)
    }

    pub fn ended(&self) -> u64 {
        self.ended.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl BackgroundPermitProvider for CountingPermitProvider {
    fn begin(&self, _name: &str) -> Result<PermitId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn end(&self, id: PermitId) {
        let removed = self
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed {
            self.ended.fetch_add(1, Ordering::SeqCst);
        } else {
            warn!("background permit {id} ended twice or never began");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_releases_once() {
        let provider = Arc::new(CountingPermitProvider::new());
        {
            let permit = BackgroundPermit::acquire(provider.clone(), "test").unwrap();
            assert_eq!(permit.id(), 1);
            assert_eq!(provider.outstanding(), 1);
        }
        assert_eq!(provider.begun(), 1);
        assert_eq!(provider.ended(), 1);
        assert_eq!(provider.outstanding(), 0);
    }
}
