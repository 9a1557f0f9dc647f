//! GPS fix model

use course_registry::GeoPoint;
use serde::{Deserialize, Serialize};

/// Receiver status flag from the RMC sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FixStatus {
    /// 'A': data valid
    #[serde(rename = "A")]
    Active,
    /// 'V': receiver warning
    #[serde(rename = "V")]
    #[default]
    Void,
}

/// One structured GPS position reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub lat: f64,
    pub lon: f64,
    /// GGA fix quality (0 = no fix)
    pub quality: u8,
    pub status: FixStatus,
    /// Course over ground (degrees clockwise from north)
    pub heading: f64,
    pub sats: u8,
}

impl GpsFix {
    /// Whether the fix can be used for timing: the receiver reports a fix of
    /// at least `min_quality` (or an active RMC status) and the position is
    /// finite and not the null island placeholder. Heading is not required;
    /// a receiver at standstill may report no course over ground.
    pub fn is_valid(&self, min_quality: u8) -> bool {
        let has_fix = (self.quality > 0 && self.quality >= min_quality) || self.status == FixStatus::Active;
        let finite = self.lat.is_finite() && self.lon.is_finite();
        has_fix && finite && !(self.lat == 0.0 && self.lon == 0.0)
    }

    /// Course over ground, when the receiver reported one
    pub fn course_over_ground(&self) -> Option<f64> {
        self.heading.is_finite().then_some(self.heading)
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}
