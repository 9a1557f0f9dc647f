//! Display status bands for decoded channels
//!
//! Each band is the first threshold the value sits below; a value equal to a
//! threshold belongs to the band above it.

use serde::{Deserialize, Serialize};

const RPM_LOW: u16 = 4000;
const RPM_HIGH: u16 = 7000;
const RPM_SHIFT: u16 = 9000;

const WATER_TEMP_LOW: f64 = 60.0;
const WATER_TEMP_MIDDLE: f64 = 100.0;
const WATER_TEMP_WARNING: f64 = 118.0;

const OIL_TEMP_LOW: f64 = 120.0;
const OIL_TEMP_HIGH: f64 = 140.0;

/// Oil pressure bands scale with rpm squared
const OIL_PRESS_COEFF_LOW: f64 = 1.72e-6;
const OIL_PRESS_COEFF_HIGH: f64 = 2.410_880_309_49e-6;

const FUEL_PRESS_THRESHOLD: f64 = 50.0;

/// Battery voltage below which the battery is reported low
const BATTERY_LOW_THRESHOLD: f64 = 11.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RpmStatus {
    #[default]
    Low,
    Middle,
    High,
    /// At or above the shift point
    Shift,
}

impl RpmStatus {
    pub fn from_rpm(rpm: u16) -> Self {
        if rpm < RPM_LOW {
            RpmStatus::Low
        } else if rpm < RPM_HIGH {
            RpmStatus::Middle
        } else if rpm < RPM_SHIFT {
            RpmStatus::High
        } else {
            RpmStatus::Shift
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaterTempStatus {
    /// Not yet warm
    #[default]
    Low,
    Middle,
    Warning,
    High,
}

impl WaterTempStatus {
    pub fn from_celsius(temp: f64) -> Self {
        if temp < WATER_TEMP_LOW {
            WaterTempStatus::Low
        } else if temp < WATER_TEMP_MIDDLE {
            WaterTempStatus::Middle
        } else if temp < WATER_TEMP_WARNING {
            WaterTempStatus::Warning
        } else {
            WaterTempStatus::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OilTempStatus {
    #[default]
    Low,
    Middle,
    High,
}

impl OilTempStatus {
    pub fn from_celsius(temp: f64) -> Self {
        if temp < OIL_TEMP_LOW {
            OilTempStatus::Low
        } else if temp < OIL_TEMP_HIGH {
            OilTempStatus::Middle
        } else {
            OilTempStatus::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OilPressStatus {
    #[default]
    Low,
    Middle,
    High,
}

impl OilPressStatus {
    /// Band for `press` at engine speed `rpm`. With the engine stopped both
    /// limits are zero, so any reading is High.
    pub fn from_reading(press: f64, rpm: u16) -> Self {
        let rpm_sq = f64::from(rpm).powi(2);
        if press < OIL_PRESS_COEFF_LOW * rpm_sq {
            OilPressStatus::Low
        } else if press < OIL_PRESS_COEFF_HIGH * rpm_sq {
            OilPressStatus::Middle
        } else {
            OilPressStatus::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FuelPressStatus {
    #[default]
    Low,
    High,
}

impl FuelPressStatus {
    pub fn from_pressure(press: f64) -> Self {
        if press < FUEL_PRESS_THRESHOLD {
            FuelPressStatus::Low
        } else {
            FuelPressStatus::High
        }
    }
}

/// Battery health bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatteryStatus {
    #[default]
    Low,
    Ok,
}

impl BatteryStatus {
    pub fn from_voltage(voltage: f64) -> Self {
        if voltage < BATTERY_LOW_THRESHOLD {
            BatteryStatus::Low
        } else {
            BatteryStatus::Ok
        }
    }
}
