//! Dashboard configuration
//!
//! Loaded from an optional TOML file, then overridden by `DASH_*`
//! environment variables (`DASH_FUEL__TANK_CAPACITY_ML=5000`).

use crate::error::DashboardError;
use config::{Config, Environment, File};
use course_registry::CourseConfig;
use dash_protocol::layout::DEFAULT_CAN_ID;
use fuel_integrator::{FuelConfig, InjectorModel};
use lap_timer::{OdometerConfig, TimerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bus: BusConfig,
    pub fuel: FuelSettings,
    pub course: CourseSettings,
    pub odometer: OdometerSettings,
    pub storage: StorageSettings,
    pub server: ServerConfig,
    /// trace, debug, info, warn or error
    pub log_level: String,
    pub log_json: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            fuel: FuelSettings::default(),
            course: CourseSettings::default(),
            odometer: OdometerSettings::default(),
            storage: StorageSettings::default(),
            server: ServerConfig::default(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Arbitration id carrying the dash packet
    pub can_id: u32,
    /// Feed the decoder from the built-in simulator
    pub simulate: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            can_id: DEFAULT_CAN_ID,
            simulate: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelSettings {
    pub tank_capacity_ml: f64,
    /// Millilitres per raw fuel-used count
    pub ml_per_count: f64,
    pub injector_flow_cc_per_min: f64,
    pub cylinders: u32,
    /// Period for saving fuel and distance state
    pub save_interval_ms: u64,
}

impl Default for FuelSettings {
    fn default() -> Self {
        let fuel = FuelConfig::default();
        let injector = InjectorModel::default();
        Self {
            tank_capacity_ml: fuel.tank_capacity_ml,
            ml_per_count: fuel.ml_per_count,
            injector_flow_cc_per_min: injector.flow_cc_per_min,
            cylinders: injector.cylinders,
            save_interval_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseSettings {
    pub gate_width_m: f64,
    pub crossing_cooldown_ms: u64,
    pub min_quality: u8,
}

impl Default for CourseSettings {
    fn default() -> Self {
        let timer = TimerConfig::default();
        Self {
            gate_width_m: CourseConfig::default().gate_width_m,
            crossing_cooldown_ms: timer.crossing_cooldown_ms,
            min_quality: timer.min_quality,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OdometerSettings {
    /// Tire set mounted at startup
    pub tire: String,
}

impl Default for OdometerSettings {
    fn default() -> Self {
        Self {
            tire: OdometerConfig::default().tire,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub fuel_file: String,
    pub course_file: String,
    pub distance_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            fuel_file: "fuel_state.json".to_string(),
            course_file: "course_data.json".to_string(),
            distance_file: "distance_state.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Display/relay tick period
    pub tick_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            tick_ms: 50,
        }
    }
}

impl DashboardConfig {
    /// Load from `path` (missing file is fine) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, DashboardError> {
        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(false)),
            None => builder.add_source(File::with_name("dashboard").required(false)),
        };

        let config = builder
            .add_source(
                Environment::with_prefix("DASH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<DashboardConfig>()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DashboardError> {
        if self.server.tick_ms == 0 {
            return Err(DashboardError::InvalidConfig("server.tick_ms must be positive".into()));
        }
        if self.fuel.save_interval_ms == 0 {
            return Err(DashboardError::InvalidConfig(
                "fuel.save_interval_ms must be positive".into(),
            ));
        }
        let width = self.course.gate_width_m;
        if width.is_nan() || width <= 0.0 {
            return Err(DashboardError::InvalidConfig(format!(
                "course.gate_width_m {} must be positive",
                width
            )));
        }
        if self.odometer.tire.trim().is_empty() {
            return Err(DashboardError::InvalidConfig("odometer.tire must not be empty".into()));
        }
        Ok(())
    }

    pub fn fuel_config(&self) -> FuelConfig {
        FuelConfig {
            tank_capacity_ml: self.fuel.tank_capacity_ml,
            ml_per_count: self.fuel.ml_per_count,
        }
    }

    pub fn injector_model(&self) -> InjectorModel {
        InjectorModel {
            flow_cc_per_min: self.fuel.injector_flow_cc_per_min,
            cylinders: self.fuel.cylinders,
        }
    }

    pub fn course_config(&self) -> CourseConfig {
        CourseConfig {
            gate_width_m: self.course.gate_width_m,
        }
    }

    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig {
            crossing_cooldown_ms: self.course.crossing_cooldown_ms,
            min_quality: self.course.min_quality,
        }
    }

    pub fn odometer_config(&self) -> OdometerConfig {
        OdometerConfig {
            tire: self.odometer.tire.trim().to_string(),
        }
    }

    pub fn fuel_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.fuel_file)
    }

    pub fn course_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.course_file)
    }

    pub fn distance_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.distance_file)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.server.tick_ms)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_millis(self.fuel.save_interval_ms)
    }
}
