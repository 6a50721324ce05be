pub mod aggregator;
pub mod controller;
pub mod permit;
pub mod recorder;
pub mod sinks;
pub mod state;
pub mod workout;

pub use aggregator::{MetricsAggregator, SignalUpdate};
pub use controller::{SessionController, SessionDeps, SessionEnded};
pub use permit::{BackgroundPermit, BackgroundPermitProvider, CountingPermitProvider, PermitId};
pub use recorder::{calculate_session_summary, SegmentRecorder};
pub use sinks::{FitnessRecordSink, SummarySink, WorkoutEntry};
pub use state::{SessionEvent, SessionState, Transition};
pub use workout::{SessionSnapshot, TransitionOutcome, WorkoutSession};
