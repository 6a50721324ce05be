use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    NotStarted,
    Active,
    Paused,
    Finished,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::NotStarted
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SessionEvent {
    Start,
    Pause,
    Resume,
    End,
}

impl SessionEvent {
    pub const ALL: [SessionEvent; 4] = [
        SessionEvent::Start,
        SessionEvent::Pause,
        SessionEvent::Resume,
        SessionEvent::End,
    ];
}

/// What a (state, event) pair does. Produced only by [`SessionState::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Leaves state and accumulators untouched.
    Ignore,
    /// Fresh session: zero accumulators, clear segments, open a segment.
    BeginSession,
    /// `start` while paused; handled according to `PausedStartPolicy`.
    RestartFromPaused,
    /// Close the running segment and stop timer and tracking.
    PauseSegment,
    /// Open a new segment after a pause.
    ResumeSegment,
    /// Close the running segment, then summarise and reset.
    FinishActive,
    /// Summarise and reset; the last segment was closed on pause.
    FinishPaused,
}

impl SessionState {
    pub const ALL: [SessionState; 4] = [
        SessionState::NotStarted,
        SessionState::Active,
        SessionState::Paused,
        SessionState::Finished,
    ];

    pub fn on(self, event: SessionEvent) -> Transition {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (S::NotStarted, E::Start) => Transition::BeginSession,
            (S::NotStarted, E::Pause | E::Resume | E::End) => Transition::Ignore,

            (S::Active, E::Pause) => Transition::PauseSegment,
            (S::Active, E::End) => Transition::FinishActive,
            (S::Active, E::Start | E::Resume) => Transition::Ignore,

            (S::Paused, E::Start) => Transition::RestartFromPaused,
            (S::Paused, E::Resume) => Transition::ResumeSegment,
            (S::Paused, E::End) => Transition::FinishPaused,
            (S::Paused, E::Pause) => Transition::Ignore,

            (S::Finished, E::Start) => Transition::BeginSession,
            (S::Finished, E::Pause | E::Resume | E::End) => Transition::Ignore,
        }
    }

    pub fn is_recording(self) -> bool {
        matches!(self, SessionState::Active | SessionState::Paused)
    }
}

impl Transition {
    pub fn next_state(self, current: SessionState) -> SessionState {
        match self {
            Transition::Ignore => current,
            Transition::BeginSession
            | Transition::RestartFromPaused
            | Transition::ResumeSegment => SessionState::Active,
            Transition::PauseSegment => SessionState::Paused,
            Transition::FinishActive | Transition::FinishPaused => SessionState::Finished,
        }
    }

    pub fn opens_segment(self) -> bool {
        matches!(
            self,
            Transition::BeginSession | Transition::RestartFromPaused | Transition::ResumeSegment
        )
    }

    pub fn stops_recording(self) -> bool {
        matches!(
            self,
            Transition::PauseSegment | Transition::FinishActive | Transition::FinishPaused
        )
    }

    pub fn produces_summary(self) -> bool {
        matches!(self, Transition::FinishActive | Transition::FinishPaused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_lifecycle() {
        use SessionEvent as E;
        use SessionState as S;

        let expected = [
            (S::NotStarted, E::Start, S::Active),
            (S::NotStarted, E::Pause, S::NotStarted),
            (S::NotStarted, E::Resume, S::NotStarted),
            (S::NotStarted, E::End, S::NotStarted),
            (S::Active, E::Start, S::Active),
            (S::Active, E::Pause, S::Paused),
            (S::Active, E::Resume, S::Active),
            (S::Active, E::End, S::Finished),
            (S::Paused, E::Start, S::Active),
            (S::Paused, E::Pause, S::Paused),
            (S::Paused, E::Resume, S::Active),
            (S::Paused, E::End, S::Finished),
            (S::Finished, E::Start, S::Active),
            (S::Finished, E::Pause, S::Finished),
            (S::Finished, E::Resume, S::Finished),
            (S::Finished, E::End, S::Finished),
        ];

        for (state, event, next) in expected {
            assert_eq!(
                state.on(event).next_state(state),
                next,
                "{state:?} + {event:?}"
            );
        }
    }

    #[test]
    fn self_loops_are_ignored() {
        for state in SessionState::ALL {
            for event in SessionEvent::ALL {
                let transition = state.on(event);
                if transition.next_state(state) == state {
                    assert_eq!(transition, Transition::Ignore, "{state:?} + {event:?}");
                }
            }
        }
    }

    #[test]
    fn only_end_produces_summary() {
        for state in SessionState::ALL {
            for event in SessionEvent::ALL {
                if state.on(event).produces_summary() {
                    assert_eq!(event, SessionEvent::End);
                    assert!(state.is_recording());
                }
            }
        }
    }
}
