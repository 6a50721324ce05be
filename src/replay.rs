//! Deterministic playback of recorded rides.
//!
//! A replay file holds one JSON event per line, tagged by `type`:
//!
//! ```text
//! {"type":"start"}
//! {"type":"fix","latitude":39.9,"longitude":116.4,"speed_mps":4.2}
//! {"type":"tick","count":30}
//! {"type":"pause"}
//! ```
//!
//! Time is virtual: it starts at the replay origin and advances one tick
//! interval per tick, so the same file always yields the same summary.

use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    models::{MotionSample, PositionFix, SessionSummary, Vitals, Wgs84Position},
    session::{
        CountingPermitProvider, SessionEvent, SessionSnapshot, SessionState, Transition,
        WorkoutSession,
    },
    settings::TrackerSettings,
};

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    Start,
    Pause,
    Resume,
    End,
    Tick {
        #[serde(default = "one")]
        count: u32,
    },
    Fix {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        speed_mps: f64,
    },
    Motion {
        cumulative_distance_m: f64,
        #[serde(default)]
        current_pace_s_per_m: Option<f64>,
    },
    Vitals {
        heart_rate: u32,
        #[serde(default)]
        calories: f64,
    },
}

#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    /// One per `end` that finished a session, in file order.
    pub summaries: Vec<SessionSummary>,
    pub final_state: SessionState,
    pub snapshot: SessionSnapshot,
    pub ignored_transitions: usize,
    /// Fixes, motion samples and vitals that arrived while not recording.
    pub dropped_samples: usize,
}

pub fn parse_events(input: &str) -> Result<Vec<ReplayEvent>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line.trim())
                .with_context(|| format!("invalid replay event on line {}", index + 1))
        })
        .collect()
}

pub fn load_events(path: &Path) -> Result<Vec<ReplayEvent>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read replay file {}", path.display()))?;
    parse_events(&contents)
}

/// Replays `events` starting from the current wall-clock second.
pub fn run(events: &[ReplayEvent], settings: &TrackerSettings) -> ReplayOutcome {
    run_from(events, settings, Utc::now().trunc_subsecs(0))
}

pub fn run_from(
    events: &[ReplayEvent],
    settings: &TrackerSettings,
    origin: DateTime<Utc>,
) -> ReplayOutcome {
    let permits = Arc::new(CountingPermitProvider::new());
    let mut session = WorkoutSession::new(settings, permits.clone());

    let has_fixes = events.iter().any(|e| matches!(e, ReplayEvent::Fix { .. }));
    let has_motion = events.iter().any(|e| matches!(e, ReplayEvent::Motion { .. }));
    session.set_capabilities(has_fixes || !has_motion, has_motion);

    let tick = chrono::Duration::from_std(settings.tick_interval())
        .unwrap_or_else(|_| chrono::Duration::seconds(1));
    let mut now = origin;
    let mut summaries = Vec::new();
    let mut ignored_transitions = 0;
    let mut dropped_samples = 0;

    for event in events {
        let transition = match event {
            ReplayEvent::Start => Some(SessionEvent::Start),
            ReplayEvent::Pause => Some(SessionEvent::Pause),
            ReplayEvent::Resume => Some(SessionEvent::Resume),
            ReplayEvent::End => Some(SessionEvent::End),
            ReplayEvent::Tick { count } => {
                for _ in 0..*count {
                    session.tick();
                    now += tick;
                }
                None
            }
            ReplayEvent::Fix {
                latitude,
                longitude,
                speed_mps,
            } => {
                let accepted = session.ingest_fix(PositionFix {
                    position: Wgs84Position::new(*latitude, *longitude),
                    speed_mps: *speed_mps,
                    timestamp: now,
                });
                if !accepted {
                    dropped_samples += 1;
                }
                None
            }
            ReplayEvent::Motion {
                cumulative_distance_m,
                current_pace_s_per_m,
            } => {
                let accepted = session.ingest_motion(MotionSample {
                    cumulative_distance_m: *cumulative_distance_m,
                    current_pace_s_per_m: *current_pace_s_per_m,
                });
                if !accepted {
                    dropped_samples += 1;
                }
                None
            }
            ReplayEvent::Vitals {
                heart_rate,
                calories,
            } => {
                let accepted = session.record_vitals(Vitals {
                    heart_rate: *heart_rate,
                    calories: *calories,
                });
                if !accepted {
                    dropped_samples += 1;
                }
                None
            }
        };

        if let Some(transition) = transition {
            let outcome = session.handle(transition, now);
            if outcome.transition == Transition::Ignore {
                ignored_transitions += 1;
            }
            if let Some(summary) = outcome.summary {
                summaries.push(summary);
            }
        }
    }

    if dropped_samples > 0 {
        debug!("{dropped_samples} replay samples arrived outside a recording segment");
    }
    info!(
        "replayed {} events: {} session(s), final state {:?}, {} permit(s) outstanding",
        events.len(),
        summaries.len(),
        session.state(),
        permits.outstanding()
    );

    ReplayOutcome {
        summaries,
        final_state: session.state(),
        snapshot: session.snapshot(),
        ignored_transitions,
        dropped_samples,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;

    fn origin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 7, 30, 0).unwrap()
    }

    #[test]
    fn parses_tagged_lines_and_skips_comments() {
        let input = r#"
# warm-up loop
{"type":"start"}
{"type":"tick"}
{"type":"tick","count":5}
{"type":"fix","latitude":39.9,"longitude":116.4}
{"type":"motion","cumulative_distance_m":120.0,"current_pace_s_per_m":0.25}
{"type":"vitals","heart_rate":130}
{"type":"end"}
"#;
        let events = parse_events(input).unwrap();
        assert_eq!(events.len(), 7);
        assert_eq!(events[1], ReplayEvent::Tick { count: 1 });
        assert_eq!(
            events[3],
            ReplayEvent::Fix {
                latitude: 39.9,
                longitude: 116.4,
                speed_mps: 0.0
            }
        );
        assert_eq!(
            events[5],
            ReplayEvent::Vitals {
                heart_rate: 130,
                calories: 0.0
            }
        );
    }

    #[test]
    fn reports_the_offending_line() {
        let err = parse_events("{\"type\":\"start\"}\n{\"type\":\"warp\"}").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn motion_only_ride_summarises_two_segments() {
        let mut events = vec![ReplayEvent::Start];
        for second in 1..=60 {
            events.push(ReplayEvent::Motion {
                cumulative_distance_m: second as f64 * 5.0,
                current_pace_s_per_m: Some(0.2),
            });
            events.push(ReplayEvent::Tick { count: 1 });
        }
        events.push(ReplayEvent::Pause);
        events.push(ReplayEvent::Pause);
        events.push(ReplayEvent::Resume);
        events.push(ReplayEvent::Motion {
            cumulative_distance_m: 300.0,
            current_pace_s_per_m: Some(0.2),
        });
        events.push(ReplayEvent::Tick { count: 60 });
        events.push(ReplayEvent::End);

        let outcome = run_from(&events, &TrackerSettings::default(), origin());
        assert_eq!(outcome.final_state, SessionState::Finished);
        assert_eq!(outcome.ignored_transitions, 1);
        assert_eq!(outcome.summaries.len(), 1);

        let summary = &outcome.summaries[0];
        assert_eq!(summary.total_duration, Duration::from_secs(120));
        assert_eq!(summary.segments.len(), 2);
        assert!((summary.total_distance - 0.6).abs() < 1e-9);
        assert!((summary.average_speed - 18.0).abs() < 1e-9);
        assert_eq!(summary.started_at, Some(origin()));
        assert_eq!(summary.segments[0].start_time, origin() + chrono::Duration::seconds(60));
        assert_eq!(summary.date, origin() + chrono::Duration::seconds(120));
    }

    #[test]
    fn counts_samples_outside_segments() {
        let events = vec![
            ReplayEvent::Fix {
                latitude: 48.0,
                longitude: 2.0,
                speed_mps: 3.0,
            },
            ReplayEvent::Vitals {
                heart_rate: 100,
                calories: 0.0,
            },
            ReplayEvent::Start,
            ReplayEvent::Tick { count: 3 },
        ];

        let outcome = run_from(&events, &TrackerSettings::default(), origin());
        assert_eq!(outcome.dropped_samples, 2);
        assert_eq!(outcome.final_state, SessionState::Active);
        assert!(outcome.summaries.is_empty());
        assert_eq!(outcome.snapshot.metrics.workout_time, Duration::from_secs(3));
    }
}
