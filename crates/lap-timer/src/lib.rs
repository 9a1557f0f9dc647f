//! Lap and Sector Timing
//!
//! Consumes GPS fixes, tests each movement segment against the gate the car
//! is expected to cross next and sequences through the course's gates to
//! produce lap and sector times. The same fixes drive a GPS odometer.

mod error;
mod fix;
mod odometer;
mod session;
mod timer;

pub use error::{OdometerError, SessionError};
pub use fix::{FixStatus, GpsFix};
pub use odometer::{
    Odometer, OdometerConfig, OdometerReading, DEFAULT_TIRES, MAX_GPS_STEP_KM,
};
pub use session::RaceSession;
pub use timer::{LapEvent, LapTimer, TimerConfig, TimerPhase};
