mod metrics;
mod position;
mod segment;
mod session;

pub use metrics::Metrics;
pub use position::{Gcj02Position, MotionSample, PositionFix, Vitals, Wgs84Position};
pub use segment::Segment;
pub use session::{SessionInfo, SessionSummary};
