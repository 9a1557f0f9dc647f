//! Injector pulse-width flow estimate

use serde::{Deserialize, Serialize};

/// Injector characteristics used to estimate instantaneous fuel flow
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InjectorModel {
    /// Static injector flow (cc/min)
    pub flow_cc_per_min: f64,
    /// Number of cylinders
    pub cylinders: u32,
}

impl Default for InjectorModel {
    fn default() -> Self {
        Self {
            flow_cc_per_min: 186.8,
            cylinders: 4,
        }
    }
}

impl InjectorModel {
    /// Estimated engine fuel flow (ml/s) for a four-stroke engine with one
    /// injection per cylinder every two revolutions
    pub fn flow_ml_per_s(&self, rpm: f64, effective_pulse_width_us: f64) -> f64 {
        if rpm <= 0.0 || effective_pulse_width_us <= 0.0 {
            return 0.0;
        }

        let injections_per_s = rpm / 120.0;
        let open_ms_per_s = effective_pulse_width_us / 1000.0 * injections_per_s;
        let cc_per_ms = self.flow_cc_per_min / 60.0 / 1000.0;
        open_ms_per_s * cc_per_ms * self.cylinders as f64
    }
}
