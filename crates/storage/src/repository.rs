//! Repository Implementation

use crate::StorageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persisted fuel state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelRecord {
    pub remaining_ml: f64,
    #[serde(default)]
    pub consumed_total_ml: f64,
}

/// Persisted course waypoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaypointRecord {
    pub index: u32,
    pub lat: f64,
    pub lon: f64,
    pub heading: f64,
}

/// Persisted odometer state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DistanceRecord {
    pub total_km: f64,
    pub daily_km: f64,
    /// ISO date `daily_km` belongs to; empty when never saved
    #[serde(default)]
    pub last_date: String,
    #[serde(default)]
    pub tire_mileage: BTreeMap<String, f64>,
}

/// A single JSON document on disk
pub struct JsonStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonStore<T> {
    /// Create a store backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document; `Ok(None)` when the file does not exist yet
    pub fn load(&self) -> Result<Option<T>, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No document at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    /// Replace the document
    pub fn save(&self, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        debug!("Saved {}", self.path.display());
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

/// Fuel state repository
pub struct FuelStore {
    store: JsonStore<FuelRecord>,
}

impl FuelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(path),
        }
    }

    /// Load the saved fuel state, rejecting negative or non-finite amounts
    pub fn load(&self) -> Result<Option<FuelRecord>, StorageError> {
        let Some(record) = self.store.load()? else {
            return Ok(None);
        };

        if !record.remaining_ml.is_finite() || record.remaining_ml < 0.0 {
            return Err(StorageError::InvalidRecord(format!(
                "remaining_ml {}",
                record.remaining_ml
            )));
        }
        if !record.consumed_total_ml.is_finite() || record.consumed_total_ml < 0.0 {
            return Err(StorageError::InvalidRecord(format!(
                "consumed_total_ml {}",
                record.consumed_total_ml
            )));
        }

        info!(
            "Fuel state loaded: remaining={:.1}ml, consumed total={:.1}ml",
            record.remaining_ml, record.consumed_total_ml
        );
        Ok(Some(record))
    }

    pub fn save(&self, record: &FuelRecord) -> Result<(), StorageError> {
        self.store.save(record)
    }
}

/// Odometer repository
pub struct DistanceStore {
    store: JsonStore<DistanceRecord>,
}

impl DistanceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(path),
        }
    }

    /// Load the saved distances, rejecting negative or non-finite amounts
    pub fn load(&self) -> Result<Option<DistanceRecord>, StorageError> {
        let Some(record) = self.store.load()? else {
            return Ok(None);
        };

        let valid = |km: f64| km.is_finite() && km >= 0.0;
        if !valid(record.total_km) || !valid(record.daily_km) {
            return Err(StorageError::InvalidRecord(format!(
                "total_km {}, daily_km {}",
                record.total_km, record.daily_km
            )));
        }
        if let Some((tire, km)) = record.tire_mileage.iter().find(|(_, km)| !valid(**km)) {
            return Err(StorageError::InvalidRecord(format!("tire '{}' at {} km", tire, km)));
        }

        info!("Distance state loaded: total={:.1}km", record.total_km);
        Ok(Some(record))
    }

    pub fn save(&self, record: &DistanceRecord) -> Result<(), StorageError> {
        self.store.save(record)
    }
}

/// Course definition repository
pub struct CourseStore {
    store: JsonStore<Vec<WaypointRecord>>,
}

impl CourseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(path),
        }
    }

    /// Load waypoints sorted by index, keeping the last entry for a repeated index
    pub fn load(&self) -> Result<Vec<WaypointRecord>, StorageError> {
        let mut records = self.store.load()?.unwrap_or_default();

        records.reverse();
        records.sort_by_key(|r| r.index);
        records.dedup_by_key(|r| r.index);

        if let Some(bad) = records
            .iter()
            .find(|r| !(r.lat.is_finite() && r.lon.is_finite() && r.heading.is_finite()))
        {
            return Err(StorageError::InvalidRecord(format!(
                "waypoint {} has non-finite coordinates",
                bad.index
            )));
        }

        info!("Loaded {} course waypoints", records.len());
        Ok(records)
    }

    pub fn save(&self, records: &[WaypointRecord]) -> Result<(), StorageError> {
        self.store.save(&records.to_vec())
    }
}
