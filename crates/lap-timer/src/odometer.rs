//! GPS odometer
//!
//! The race session keeps a running session distance summed from
//! fix-to-fix steps. The odometer folds increases of that figure into the
//! lifetime, daily and per-tire totals. A decrease means the session was
//! reset: the odometer rebases on the new value and adds nothing.

use crate::error::OdometerError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use storage::DistanceRecord;
use tracing::{debug, info, warn};

/// Steps at or above this distance between consecutive fixes are GPS jumps
pub const MAX_GPS_STEP_KM: f64 = 0.5;

/// Tire sets known before anything is loaded
pub const DEFAULT_TIRES: [&str; 7] = [
    "Dry 1", "Dry 2", "Dry 3", "Dry 4", "Dry 5", "Wet 1", "Wet 2",
];

/// Odometer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometerConfig {
    /// Tire set mounted at startup
    pub tire: String,
}

impl Default for OdometerConfig {
    fn default() -> Self {
        Self {
            tire: DEFAULT_TIRES[0].to_string(),
        }
    }
}

/// Distance figures from one lock acquisition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OdometerReading {
    pub total_km: f64,
    pub daily_km: f64,
    pub session_km: f64,
    pub tire: String,
    pub tire_km: f64,
}

#[derive(Debug)]
struct OdometerState {
    total_km: f64,
    daily_km: f64,
    day: Option<NaiveDate>,
    tires: BTreeMap<String, f64>,
    tire: String,
    last_session_km: f64,
}

impl OdometerState {
    fn reading(&self) -> OdometerReading {
        OdometerReading {
            total_km: self.total_km,
            daily_km: self.daily_km,
            session_km: self.last_session_km,
            tire: self.tire.clone(),
            tire_km: self.tires.get(&self.tire).copied().unwrap_or(0.0),
        }
    }
}

fn default_tires() -> BTreeMap<String, f64> {
    DEFAULT_TIRES
        .iter()
        .map(|name| (name.to_string(), 0.0))
        .collect()
}

/// Lifetime, daily and per-tire distance. Shared between the GPS consumer
/// and the API, hence interior mutability.
#[derive(Debug)]
pub struct Odometer {
    state: Mutex<OdometerState>,
}

impl Odometer {
    pub fn new(config: OdometerConfig) -> Self {
        let mut tires = default_tires();
        tires.entry(config.tire.clone()).or_insert(0.0);
        Self {
            state: Mutex::new(OdometerState {
                total_km: 0.0,
                daily_km: 0.0,
                day: None,
                tires,
                tire: config.tire,
                last_session_km: 0.0,
            }),
        }
    }

    /// Seed totals from a saved record. The daily figure only carries over
    /// when it was saved on `today`.
    pub fn restore(&self, record: &DistanceRecord, today: NaiveDate) {
        let mut state = self.lock();
        state.total_km = record.total_km;

        let saved_day = NaiveDate::parse_from_str(&record.last_date, "%Y-%m-%d").ok();
        state.daily_km = if saved_day == Some(today) {
            record.daily_km
        } else {
            0.0
        };
        state.day = Some(today);

        for (name, km) in &record.tire_mileage {
            state.tires.insert(name.clone(), *km);
        }
        info!(
            "Distance state restored: total={:.1}km, daily={:.1}km",
            state.total_km, state.daily_km
        );
    }

    /// Feed the current cumulative session distance (km)
    pub fn record(&self, session_km: f64) {
        if !session_km.is_finite() {
            warn!("Ignoring non-finite session distance");
            return;
        }

        let mut state = self.lock();
        let delta = session_km - state.last_session_km;
        state.last_session_km = session_km;
        if delta < 0.0 {
            debug!("Session distance rebased at {:.3}km", session_km);
            return;
        }

        state.total_km += delta;
        state.daily_km += delta;
        let tire = state.tire.clone();
        *state.tires.entry(tire).or_insert(0.0) += delta;
    }

    /// Switch the mounted tire set; unknown names are registered at 0 km
    pub fn select_tire(&self, name: &str) -> Result<OdometerReading, OdometerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OdometerError::EmptyTireName);
        }

        let mut state = self.lock();
        state.tires.entry(name.to_string()).or_insert(0.0);
        state.tire = name.to_string();
        info!("Tire set selected: {}", name);
        Ok(state.reading())
    }

    /// Zero the daily distance when the date changed. Returns whether it did.
    pub fn roll_day(&self, today: NaiveDate) -> bool {
        let mut state = self.lock();
        let day = state.day;
        match day {
            Some(day) if day == today => false,
            Some(_) => {
                info!("New day, daily distance was {:.1}km", state.daily_km);
                state.daily_km = 0.0;
                state.day = Some(today);
                true
            }
            None => {
                state.day = Some(today);
                false
            }
        }
    }

    pub fn reading(&self) -> OdometerReading {
        self.lock().reading()
    }

    pub fn tire_mileage(&self) -> BTreeMap<String, f64> {
        self.lock().tires.clone()
    }

    /// Record to persist
    pub fn to_record(&self) -> DistanceRecord {
        let state = self.lock();
        DistanceRecord {
            total_km: state.total_km,
            daily_km: state.daily_km,
            last_date: state
                .day
                .map(|day| day.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            tire_mileage: state.tires.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, OdometerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Odometer {
    fn default() -> Self {
        Self::new(OdometerConfig::default())
    }
}
