//! Course waypoint registry

use crate::config::CourseConfig;
use crate::error::CourseError;
use crate::geo::{Gate, GeoOffset, GeoPoint};
use crate::START_FINISH;
use serde::{Deserialize, Serialize};
use storage::{CourseStore, WaypointRecord};
use tracing::{debug, info, warn};

/// A recorded course position: index 0 is start/finish, 1..N are sectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub index: u32,
    pub lat: f64,
    pub lon: f64,
    /// Direction of travel (degrees clockwise from north, [0, 360))
    pub heading: f64,
}

impl Waypoint {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

impl From<WaypointRecord> for Waypoint {
    fn from(r: WaypointRecord) -> Self {
        Self {
            index: r.index,
            lat: r.lat,
            lon: r.lon,
            heading: r.heading.rem_euclid(360.0),
        }
    }
}

impl From<&Waypoint> for WaypointRecord {
    fn from(w: &Waypoint) -> Self {
        Self {
            index: w.index,
            lat: w.lat,
            lon: w.lon,
            heading: w.heading,
        }
    }
}

/// Ordered, durable set of course waypoints.
///
/// Every mutation is written through to the attached store; a failed write
/// is logged and the in-memory course stays authoritative.
pub struct CourseRegistry {
    config: CourseConfig,
    waypoints: Vec<Waypoint>,
    offset: GeoOffset,
    store: Option<CourseStore>,
}

impl CourseRegistry {
    /// Create an empty, in-memory registry
    pub fn new(config: CourseConfig) -> Self {
        Self {
            config,
            waypoints: Vec::new(),
            offset: GeoOffset::default(),
            store: None,
        }
    }

    /// Create a registry backed by a store, loading any saved course
    pub fn with_store(config: CourseConfig, store: CourseStore) -> Self {
        let waypoints = match store.load() {
            Ok(records) => records.into_iter().map(Waypoint::from).collect(),
            Err(e) => {
                warn!("Failed to load course, starting empty: {}", e);
                Vec::new()
            }
        };

        Self {
            config,
            waypoints,
            offset: GeoOffset::default(),
            store: Some(store),
        }
    }

    /// Register or replace a waypoint. Setting index 0 starts a fresh course:
    /// the calibration offset and all other waypoints are discarded.
    pub fn set_waypoint(
        &mut self,
        index: u32,
        lat: f64,
        lon: f64,
        heading: f64,
    ) -> Result<(), CourseError> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && heading.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        if !valid {
            return Err(CourseError::InvalidCoordinates { lat, lon, heading });
        }

        if index == START_FINISH {
            if self.waypoints.len() > 1 {
                info!("Start line redefined, dropping {} sector waypoints", self.waypoints.len() - 1);
            }
            self.offset = GeoOffset::default();
            self.waypoints.clear();
        }

        let waypoint = Waypoint {
            index,
            lat,
            lon,
            heading: heading.rem_euclid(360.0),
        };
        match self.waypoints.binary_search_by_key(&index, |w| w.index) {
            Ok(pos) => self.waypoints[pos] = waypoint,
            Err(pos) => self.waypoints.insert(pos, waypoint),
        }

        info!("Waypoint {} set: {:.7}, {:.7}, {:.1}deg", index, lat, lon, waypoint.heading);
        self.persist();
        Ok(())
    }

    /// Translate the whole course so waypoint 0 sits at the given position
    pub fn calibrate(&mut self, lat: f64, lon: f64) -> Result<GeoOffset, CourseError> {
        let start = self.get_waypoint(START_FINISH).ok_or(CourseError::NoStartLine)?;
        self.offset = GeoOffset {
            dlat: lat - start.lat,
            dlon: lon - start.lon,
        };
        info!(
            "Course calibrated: offset dlat={:.7}, dlon={:.7}",
            self.offset.dlat, self.offset.dlon
        );
        Ok(self.offset)
    }

    /// Stored (uncalibrated) waypoint
    pub fn get_waypoint(&self, index: u32) -> Option<Waypoint> {
        self.waypoints
            .binary_search_by_key(&index, |w| w.index)
            .ok()
            .map(|pos| self.waypoints[pos])
    }

    /// Gate for a waypoint, calibration applied
    pub fn get_gate(&self, index: u32) -> Option<Gate> {
        let waypoint = self.get_waypoint(index)?;
        let center = waypoint.position().offset_by(self.offset);
        Some(Gate::new(index, center, waypoint.heading, self.config.gate_width_m))
    }

    /// Next defined index above `after`, wrapping to the start/finish line
    pub fn next_index(&self, after: u32) -> u32 {
        self.waypoints
            .iter()
            .map(|w| w.index)
            .find(|&i| i > after)
            .unwrap_or(START_FINISH)
    }

    /// Waypoints in index order
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn has_start_line(&self) -> bool {
        self.get_waypoint(START_FINISH).is_some()
    }

    /// Number of sector waypoints (index > 0)
    pub fn sector_count(&self) -> usize {
        self.waypoints.iter().filter(|w| w.index != START_FINISH).count()
    }

    pub fn offset(&self) -> GeoOffset {
        self.offset
    }

    /// Remove every waypoint and the calibration
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.offset = GeoOffset::default();
        self.persist();
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let records: Vec<WaypointRecord> = self.waypoints.iter().map(WaypointRecord::from).collect();
        match store.save(&records) {
            Ok(()) => debug!("Course saved ({} waypoints)", records.len()),
            Err(e) => warn!("Failed to save course: {}", e),
        }
    }
}

impl Default for CourseRegistry {
    fn default() -> Self {
        Self::new(CourseConfig::default())
    }
}
