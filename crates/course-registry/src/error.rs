//! Course Error Types

use thiserror::Error;

/// Errors from course registry operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CourseError {
    /// Coordinates outside the valid range or not finite
    #[error("Invalid coordinates: lat={lat}, lon={lon}, heading={heading}")]
    InvalidCoordinates { lat: f64, lon: f64, heading: f64 },

    /// Operation needs the start/finish waypoint
    #[error("No start/finish waypoint defined")]
    NoStartLine,
}
