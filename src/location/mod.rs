pub mod converter;
pub mod route;
pub mod tracker;

pub use converter::{is_outside_correction_zone, wgs84_to_gcj02};
pub use route::{RouteBuffer, DEFAULT_ROUTE_CAPACITY};
pub use tracker::LocationTracker;
