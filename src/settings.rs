use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::PoisonError, sync::RwLock, time::Duration};

use crate::location::DEFAULT_ROUTE_CAPACITY;

/// What `start` does while the session is paused.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PausedStartPolicy {
    /// Continue the paused session, keeping its closed segments.
    Resume,
    /// Discard the paused session and begin a fresh one.
    NewSession,
}

impl Default for PausedStartPolicy {
    fn default() -> Self {
        PausedStartPolicy::Resume
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerSettings {
    pub tick_interval_ms: u64,
    pub route_capacity: usize,
    /// Fixes closer than this to the last accepted fix count as noise.
    pub min_fix_distance_m: f64,
    pub paused_start_policy: PausedStartPolicy,
    /// Live snapshots are published every N ticks.
    pub publish_every_ticks: u32,
    pub debug_ticks: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            route_capacity: DEFAULT_ROUTE_CAPACITY,
            min_fix_distance_m: 1.0,
            paused_start_policy: PausedStartPolicy::Resume,
            publish_every_ticks: 1,
            debug_ticks: false,
        }
    }
}

impl TrackerSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Applies `RIDELOG_TICK_MS` and `RIDELOG_DEBUG`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var("RIDELOG_TICK_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => self.tick_interval_ms = ms,
                _ => warn!("ignoring invalid RIDELOG_TICK_MS value '{raw}'"),
            }
        }

        let debug_mode = std::env::var("RIDELOG_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.debug_ticks = true;
        }

        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TrackerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("settings at {} are invalid ({err}); using defaults", path.display());
                TrackerSettings::default()
            })
        } else {
            TrackerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> TrackerSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, settings: TrackerSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: TrackerSettings = serde_json::from_str(&contents)?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &TrackerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.settings(), TrackerSettings::default());
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let settings = TrackerSettings {
            tick_interval_ms: 250,
            paused_start_policy: PausedStartPolicy::NewSession,
            ..TrackerSettings::default()
        };
        store.update(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.settings(), settings);
        reopened.reload().unwrap();
        assert_eq!(reopened.settings().tick_interval(), Duration::from_millis(250));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"route_capacity": 50}"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().settings();
        assert_eq!(settings.route_capacity, 50);
        assert_eq!(settings.tick_interval_ms, 1000);
        assert_eq!(settings.paused_start_policy, PausedStartPolicy::Resume);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.settings(), TrackerSettings::default());
        assert!(store.reload().is_err());
    }
}
