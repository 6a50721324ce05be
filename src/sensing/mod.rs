mod controller;
mod loop_worker;
pub mod motion;
pub mod sources;

pub use controller::{Capabilities, SensingController};
pub use motion::{pace_to_speed, MotionTracker};
pub use sources::{
    ChannelMotionSource, ChannelPositionSource, ChannelSource, MotionSource, PositionSource,
    SourceFeed,
};
