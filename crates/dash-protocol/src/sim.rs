//! Simulated dash bus for bench running without a vehicle

use crate::frame::RawFrame;
use crate::layout::DEFAULT_CAN_ID;
use crate::packet::{encode_packet, split_frames, EngineChannels};
use tracing::info;

/// Produces plausible, time-varying packets split into bus frames
pub struct SimulatedBus {
    can_id: u32,
    fuel_counter: u16,
}

impl SimulatedBus {
    /// Create a simulated bus on the given arbitration id
    pub fn new(can_id: u32) -> Self {
        info!("Creating simulated dash bus on id {:#X}", can_id);
        Self {
            can_id,
            fuel_counter: 0,
        }
    }

    /// Channels for the given time since start (ms)
    pub fn channels_at(&mut self, t_ms: u64) -> EngineChannels {
        let rpm = 1000 + (t_ms % 8000) as u16;
        // Counter advances with engine speed and wraps like the controller's
        self.fuel_counter = self.fuel_counter.wrapping_add(rpm / 1000);

        EngineChannels {
            rpm,
            throttle: (t_ms % 1001) as f64 / 10.0,
            water_temp: 80.0 + (t_ms % 400) as f64 / 10.0,
            oil_temp: 90.0 + (t_ms % 400) as f64 / 10.0,
            oil_press: 1.0 + (t_ms % 70) as f64 / 10.0,
            fuel_pressure: 3.0 + (t_ms % 11) as f64 / 10.0,
            gear_voltage: 0.5 + (t_ms % 4501) as f64 / 1000.0,
            battery_voltage: 12.0 + (t_ms % 251) as f64 / 100.0,
            fuel_used_raw: self.fuel_counter,
            effective_pulse_width_us: 800.0 + (t_ms % 9200) as f64,
        }
    }

    /// The 22 frames carrying one packet at time `t_ms`
    pub fn frames_at(&mut self, t_ms: u64) -> Vec<RawFrame> {
        let channels = self.channels_at(t_ms);
        split_frames(&encode_packet(&channels), self.can_id)
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAN_ID)
    }
}
