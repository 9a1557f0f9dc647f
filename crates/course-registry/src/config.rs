//! Course configuration

use serde::{Deserialize, Serialize};

/// Course geometry configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourseConfig {
    /// Total gate width across the track (meters)
    pub gate_width_m: f64,
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self { gate_width_m: 7.0 }
    }
}
