//! Gear position derived from the gear-sense voltage

use serde::{Deserialize, Serialize};

/// Gear-sense voltage for each position, indexed by gear number (0 = neutral)
const GEAR_VOLTAGES: [f64; 5] = [0.80, 1.53, 2.16, 2.84, 3.52];

/// Selected gear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GearPosition {
    #[default]
    Neutral,
    Gear(u8),
}

impl GearPosition {
    /// Nearest calibrated position for a gear-sense voltage
    pub fn from_voltage(voltage: f64) -> Self {
        let nearest = GEAR_VOLTAGES
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (voltage - **a)
                    .abs()
                    .total_cmp(&(voltage - **b).abs())
            })
            .map(|(i, _)| i)
            .unwrap_or(0);

        match nearest {
            0 => GearPosition::Neutral,
            n => GearPosition::Gear(n as u8),
        }
    }

    /// Display label ("N", "1", "2", ...)
    pub fn label(&self) -> String {
        match self {
            GearPosition::Neutral => "N".to_string(),
            GearPosition::Gear(n) => n.to_string(),
        }
    }
}
