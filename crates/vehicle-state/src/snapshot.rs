//! Vehicle state snapshot

use dash_protocol::{
    BatteryStatus, DecodedFrame, FuelPressStatus, GearPosition, OilPressStatus, OilTempStatus,
    RpmStatus, WaterTempStatus,
};
use fuel_integrator::FuelReading;
use lap_timer::{GpsFix, OdometerReading, RaceSession, TimerPhase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the driver display and relays read, as one value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    // Engine
    pub rpm: u16,
    /// Throttle position (%)
    pub throttle: f64,
    pub water_temp: f64,
    pub oil_temp: f64,
    pub oil_press: f64,
    pub fuel_pressure: f64,
    pub gear_voltage: f64,
    pub gear: GearPosition,
    pub battery_voltage: f64,
    pub battery: BatteryStatus,
    pub effective_pulse_width_us: f64,
    /// Seconds between the last two decoded packets
    pub delta_t: f64,
    /// Decoded packets applied so far
    pub packets: u64,

    // Display bands
    pub rpm_status: RpmStatus,
    pub water_temp_status: WaterTempStatus,
    pub oil_temp_status: OilTempStatus,
    pub oil_press_status: OilPressStatus,
    pub fuel_press_status: FuelPressStatus,

    // Fuel
    pub fuel_percent: f64,
    pub fuel_remaining_ml: f64,
    pub fuel_session_consumed_ml: f64,
    /// Injector estimate, display only
    pub fuel_flow_ml_s: f64,

    // Timing
    pub timer_phase: TimerPhase,
    pub lap_count: u32,
    pub current_lap_time: f64,
    /// Seconds on the process clock when the current lap began
    pub lap_started_at: Option<f64>,
    pub last_lap_time: Option<f64>,
    pub lap_time_diff: f64,
    pub sector_times: BTreeMap<u32, f64>,
    pub sector_diffs: BTreeMap<u32, f64>,
    pub target_gate: u32,

    // GPS
    pub gps_quality: u8,
    pub gps_sats: u8,

    // Distance
    pub odometer_total_km: f64,
    pub odometer_daily_km: f64,
    pub session_km: f64,
    pub tire: String,
    pub tire_km: f64,
}

impl Default for VehicleSnapshot {
    fn default() -> Self {
        Self {
            rpm: 0,
            throttle: 0.0,
            water_temp: 0.0,
            oil_temp: 0.0,
            oil_press: 0.0,
            fuel_pressure: 0.0,
            gear_voltage: 0.0,
            gear: GearPosition::Neutral,
            battery_voltage: 0.0,
            battery: BatteryStatus::Low,
            effective_pulse_width_us: 0.0,
            delta_t: 0.0,
            packets: 0,
            rpm_status: RpmStatus::Low,
            water_temp_status: WaterTempStatus::Low,
            oil_temp_status: OilTempStatus::Low,
            oil_press_status: OilPressStatus::Low,
            fuel_press_status: FuelPressStatus::Low,
            fuel_percent: 0.0,
            fuel_remaining_ml: 0.0,
            fuel_session_consumed_ml: 0.0,
            fuel_flow_ml_s: 0.0,
            timer_phase: TimerPhase::Idle,
            lap_count: 0,
            current_lap_time: 0.0,
            lap_started_at: None,
            last_lap_time: None,
            lap_time_diff: 0.0,
            sector_times: BTreeMap::new(),
            sector_diffs: BTreeMap::new(),
            target_gate: 0,
            gps_quality: 0,
            gps_sats: 0,
            odometer_total_km: 0.0,
            odometer_daily_km: 0.0,
            session_km: 0.0,
            tire: String::new(),
            tire_km: 0.0,
        }
    }
}

impl VehicleSnapshot {
    /// Overwrite engine fields from a validated packet
    pub fn apply_engine(&mut self, frame: &DecodedFrame) {
        let c = &frame.channels;
        self.rpm = c.rpm;
        self.throttle = c.throttle;
        self.water_temp = c.water_temp;
        self.oil_temp = c.oil_temp;
        self.oil_press = c.oil_press;
        self.fuel_pressure = c.fuel_pressure;
        self.gear_voltage = c.gear_voltage;
        self.gear = GearPosition::from_voltage(c.gear_voltage);
        self.battery_voltage = c.battery_voltage;
        self.battery = BatteryStatus::from_voltage(c.battery_voltage);
        self.effective_pulse_width_us = c.effective_pulse_width_us;
        self.delta_t = frame.delta_t;
        self.packets += 1;

        self.rpm_status = RpmStatus::from_rpm(c.rpm);
        self.water_temp_status = WaterTempStatus::from_celsius(c.water_temp);
        self.oil_temp_status = OilTempStatus::from_celsius(c.oil_temp);
        self.oil_press_status = OilPressStatus::from_reading(c.oil_press, c.rpm);
        self.fuel_press_status = FuelPressStatus::from_pressure(c.fuel_pressure);
    }

    pub fn apply_fuel(&mut self, reading: &FuelReading, flow_ml_s: f64) {
        self.fuel_percent = reading.remaining_percent;
        self.fuel_remaining_ml = reading.remaining_ml;
        self.fuel_session_consumed_ml = reading.session_consumed_ml;
        self.fuel_flow_ml_s = flow_ml_s;
    }

    /// Copy lap timing out of the race session
    pub fn apply_timing(&mut self, session: &RaceSession, now_ms: u64) {
        let timer = session.timer();
        self.timer_phase = session.phase();
        self.lap_count = timer.lap_count();
        self.current_lap_time = timer.current_lap_time(now_ms);
        self.lap_started_at = timer.lap_started_at();
        self.last_lap_time = timer.last_lap_time();
        self.lap_time_diff = timer.lap_time_diff();
        self.sector_times = timer.sector_times();
        self.sector_diffs = timer.sector_diffs().clone();
        self.target_gate = timer.target_index();
    }

    /// Advance the running lap clock without touching the timer
    pub fn refresh_lap_time(&mut self, now_ms: u64) {
        self.current_lap_time = self
            .lap_started_at
            .map_or(0.0, |start| (now_ms as f64 / 1000.0 - start).max(0.0));
    }

    pub fn apply_gps(&mut self, fix: &GpsFix) {
        self.gps_quality = fix.quality;
        self.gps_sats = fix.sats;
    }

    pub fn apply_distance(&mut self, reading: &OdometerReading) {
        self.odometer_total_km = reading.total_km;
        self.odometer_daily_km = reading.daily_km;
        self.session_km = reading.session_km;
        self.tire.clone_from(&reading.tire);
        self.tire_km = reading.tire_km;
    }
}
