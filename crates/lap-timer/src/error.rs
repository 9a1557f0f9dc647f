//! Race session error types

use course_registry::CourseError;
use thiserror::Error;

/// Errors from operator commands on the race session
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Command needs a valid GPS fix and none has been received
    #[error("No valid GPS fix available")]
    NoFix,

    /// Gate placement needs the direction of travel and the last fix had none
    #[error("Last GPS fix has no heading")]
    NoHeading,

    /// Sector commands take indices 1..N
    #[error("Invalid sector index {0}; sectors start at 1")]
    InvalidSector(u32),

    /// Course registry rejected the operation
    #[error(transparent)]
    Course(#[from] CourseError),
}

/// Errors from odometer commands
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OdometerError {
    #[error("Tire name must not be empty")]
    EmptyTireName,
}
