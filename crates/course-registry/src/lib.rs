//! Course Registry
//!
//! Keeps the ordered waypoints of a course (index 0 is the start/finish line,
//! 1..N are sector lines), applies a calibration offset and derives the
//! timing gate segment for each waypoint.

mod config;
mod error;
mod geo;
mod registry;

pub use config::CourseConfig;
pub use error::CourseError;
pub use geo::{segments_cross, GeoOffset, GeoPoint, GeoScale, Gate};
pub use registry::{CourseRegistry, Waypoint};

/// Index of the start/finish waypoint
pub const START_FINISH: u32 = 0;
