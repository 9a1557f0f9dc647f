//! Race session: course plus timer driven by the GPS consumer

use crate::error::SessionError;
use crate::fix::GpsFix;
use crate::odometer::{Odometer, MAX_GPS_STEP_KM};
use crate::timer::{LapEvent, LapTimer, TimerPhase};
use course_registry::{CourseRegistry, GeoOffset, GeoScale, START_FINISH};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns the course and the lap timer so operator commands and fixes are
/// applied in one place, in arrival order
pub struct RaceSession {
    course: CourseRegistry,
    timer: LapTimer,
    last_fix: Option<GpsFix>,
    session_km: f64,
    odometer: Option<Arc<Odometer>>,
}

impl RaceSession {
    pub fn new(course: CourseRegistry, timer: LapTimer) -> Self {
        Self {
            course,
            timer,
            last_fix: None,
            session_km: 0.0,
            odometer: None,
        }
    }

    /// Report session distance to `odometer` as fixes arrive
    pub fn with_odometer(mut self, odometer: Arc<Odometer>) -> Self {
        self.odometer = Some(odometer);
        self
    }

    /// Feed one fix to the timer, remembering it for operator commands when valid
    pub fn on_fix(&mut self, fix: GpsFix, now_ms: u64) -> Option<LapEvent> {
        if fix.is_valid(self.timer.config().min_quality) {
            self.advance_distance(&fix);
            self.last_fix = Some(fix);
        }
        self.timer.update(&self.course, &fix, now_ms)
    }

    fn advance_distance(&mut self, fix: &GpsFix) {
        let Some(prev) = self.last_fix else {
            return;
        };

        let (east, north) =
            GeoScale::at_latitude(prev.lat).to_local(prev.position(), fix.position());
        let step_km = east.hypot(north) / 1000.0;
        if step_km >= MAX_GPS_STEP_KM {
            debug!("GPS jump of {:.3}km not counted", step_km);
            return;
        }

        self.session_km += step_km;
        if let Some(odometer) = &self.odometer {
            odometer.record(self.session_km);
        }
    }

    /// Define the start/finish line at the current position and heading.
    /// The previous course is discarded and timing re-arms.
    pub fn set_start_line(&mut self) -> Result<(), SessionError> {
        let fix = self.require_fix()?;
        let heading = Self::require_heading(&fix)?;
        self.course.set_waypoint(START_FINISH, fix.lat, fix.lon, heading)?;
        self.timer.reset();
        info!("Start line set at {:.7}, {:.7}", fix.lat, fix.lon);
        Ok(())
    }

    /// Define sector gate `index` (1..N) at the current position and heading
    pub fn set_sector(&mut self, index: u32) -> Result<(), SessionError> {
        if index == START_FINISH {
            return Err(SessionError::InvalidSector(index));
        }
        let fix = self.require_fix()?;
        let heading = Self::require_heading(&fix)?;
        self.course.set_waypoint(index, fix.lat, fix.lon, heading)?;
        Ok(())
    }

    /// Shift the course so the start line sits at the current position
    pub fn calibrate(&mut self) -> Result<GeoOffset, SessionError> {
        let fix = self.require_fix()?;
        Ok(self.course.calibrate(fix.lat, fix.lon)?)
    }

    /// Forget lap history and session distance; the course is kept
    pub fn reset_session(&mut self) {
        self.timer.reset();
        self.session_km = 0.0;
        if let Some(odometer) = &self.odometer {
            odometer.record(0.0);
        }
    }

    /// Distance driven since start or the last reset (km)
    pub fn session_km(&self) -> f64 {
        self.session_km
    }

    pub fn odometer(&self) -> Option<&Arc<Odometer>> {
        self.odometer.as_ref()
    }

    pub fn course(&self) -> &CourseRegistry {
        &self.course
    }

    pub fn timer(&self) -> &LapTimer {
        &self.timer
    }

    pub fn phase(&self) -> TimerPhase {
        self.timer.phase(&self.course)
    }

    pub fn last_fix(&self) -> Option<&GpsFix> {
        self.last_fix.as_ref()
    }

    fn require_fix(&self) -> Result<GpsFix, SessionError> {
        self.last_fix.ok_or_else(|| {
            warn!("Course command rejected: no valid GPS fix");
            SessionError::NoFix
        })
    }

    fn require_heading(fix: &GpsFix) -> Result<f64, SessionError> {
        fix.course_over_ground().ok_or_else(|| {
            warn!("Gate not placed: last fix has no heading");
            SessionError::NoHeading
        })
    }
}
