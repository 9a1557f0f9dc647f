//! Counter-based fuel integrator

use crate::error::FuelError;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use storage::FuelRecord;
use tracing::{debug, info, warn};

/// Fuel integrator configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelConfig {
    /// Tank capacity (ml)
    pub tank_capacity_ml: f64,
    /// Millilitres per raw counter step
    pub ml_per_count: f64,
}

impl Default for FuelConfig {
    fn default() -> Self {
        Self {
            tank_capacity_ml: 4500.0,
            ml_per_count: 0.01,
        }
    }
}

/// Consistent view of the fuel state taken under one lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FuelReading {
    pub remaining_ml: f64,
    pub remaining_percent: f64,
    pub session_consumed_ml: f64,
    pub consumed_total_ml: f64,
}

#[derive(Debug, Clone)]
struct FuelState {
    tank_capacity: f64,
    baseline_remaining: f64,
    session_consumed: f64,
    last_raw_counter: Option<u64>,
    /// Consumption carried over from earlier sessions
    carried_total: f64,
}

impl FuelState {
    fn remaining(&self) -> f64 {
        let cap = self.tank_capacity.max(0.0);
        (self.baseline_remaining - self.session_consumed).max(0.0).min(cap)
    }

    fn percent(&self) -> f64 {
        if self.tank_capacity <= 0.0 {
            return 0.0;
        }
        100.0 * self.remaining() / self.tank_capacity
    }

    fn reading(&self) -> FuelReading {
        FuelReading {
            remaining_ml: self.remaining(),
            remaining_percent: self.percent(),
            session_consumed_ml: self.session_consumed,
            consumed_total_ml: self.carried_total + self.session_consumed,
        }
    }
}

/// Fuel integrator shared between the bus producer (writes) and the
/// periodic consumer (reads, operator reset). All access goes through one
/// mutex so multi-field reads are never torn.
pub struct FuelIntegrator {
    ml_per_count: f64,
    state: Mutex<FuelState>,
}

impl FuelIntegrator {
    /// Create an integrator starting from a full tank
    pub fn new(config: FuelConfig) -> Result<Self, FuelError> {
        if !config.ml_per_count.is_finite() || config.ml_per_count < 0.0 {
            return Err(FuelError::InvalidFactor(config.ml_per_count));
        }

        info!(
            "Creating fuel integrator: capacity={}ml, factor={}ml/count",
            config.tank_capacity_ml, config.ml_per_count
        );

        Ok(Self {
            ml_per_count: config.ml_per_count,
            state: Mutex::new(FuelState {
                tank_capacity: config.tank_capacity_ml,
                baseline_remaining: config.tank_capacity_ml,
                session_consumed: 0.0,
                last_raw_counter: None,
                carried_total: 0.0,
            }),
        })
    }

    /// Seed the baseline and lifetime total from a persisted record
    pub fn restore(&self, record: &FuelRecord) {
        let mut state = self.lock();
        state.baseline_remaining = record.remaining_ml;
        state.session_consumed = 0.0;
        state.carried_total = record.consumed_total_ml;
        info!(
            "Fuel state restored: remaining={:.1}ml, consumed total={:.1}ml",
            record.remaining_ml, record.consumed_total_ml
        );
    }

    /// Feed one raw counter reading
    pub fn record(&self, raw_counter: u64) {
        let mut state = self.lock();

        let Some(last) = state.last_raw_counter else {
            debug!("First fuel counter sample: {}", raw_counter);
            state.last_raw_counter = Some(raw_counter);
            return;
        };

        if raw_counter >= last {
            state.session_consumed += (raw_counter - last) as f64 * self.ml_per_count;
        } else {
            warn!(
                "Fuel counter went backwards ({} -> {}), treating as controller reset",
                last, raw_counter
            );
        }
        state.last_raw_counter = Some(raw_counter);
    }

    /// Remaining volume (ml), clamped to [0, capacity]
    pub fn remaining_volume(&self) -> f64 {
        self.lock().remaining()
    }

    /// Remaining volume as a percentage of capacity; 0 when capacity is not positive
    pub fn remaining_percent(&self) -> f64 {
        self.lock().percent()
    }

    /// Volume consumed since start or the last reset (ml)
    pub fn session_consumed(&self) -> f64 {
        self.lock().session_consumed
    }

    /// All fuel figures from one lock acquisition
    pub fn reading(&self) -> FuelReading {
        self.lock().reading()
    }

    /// Operator refuel: zero session consumption and set a new baseline.
    /// The last raw counter is kept so integration continues seamlessly.
    pub fn reset(&self, new_remaining: f64) -> Result<(), FuelError> {
        if !new_remaining.is_finite() || new_remaining < 0.0 {
            return Err(FuelError::InvalidRemaining(new_remaining));
        }

        let mut state = self.lock();
        state.carried_total += state.session_consumed;
        state.session_consumed = 0.0;
        state.baseline_remaining = new_remaining;
        info!("Fuel reset: remaining={:.1}ml", new_remaining);
        Ok(())
    }

    /// Tank capacity (ml)
    pub fn tank_capacity(&self) -> f64 {
        self.lock().tank_capacity
    }

    /// Record to persist
    pub fn to_record(&self) -> FuelRecord {
        let reading = self.reading();
        FuelRecord {
            remaining_ml: reading.remaining_ml,
            consumed_total_ml: reading.consumed_total_ml,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FuelState> {
        // State is plain numbers; a panic elsewhere cannot leave it half-written
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
