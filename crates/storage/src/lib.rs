//! Storage Layer
//!
//! Provides JSON file persistence with repository pattern for fuel state,
//! odometer distances and the course. Writes go through
//! a temporary file and a rename so a crash never leaves a torn document.

mod repository;

pub use repository::{
    CourseStore, DistanceRecord, DistanceStore, FuelRecord, FuelStore, JsonStore, WaypointRecord,
};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
