//! Track-scale geometry
//!
//! Positions are projected onto a local plane with an equirectangular
//! approximation: meters per degree of longitude shrink with the cosine of
//! the latitude. Adequate over a few kilometers, not geodesically exact.

use serde::{Deserialize, Serialize};

/// Meters per degree of latitude
const METERS_PER_DEG: f64 = 111_320.0;

/// A WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Translate by a calibration offset
    pub fn offset_by(&self, offset: GeoOffset) -> Self {
        Self {
            lat: self.lat + offset.dlat,
            lon: self.lon + offset.dlon,
        }
    }
}

/// Translation applied to the whole course
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoOffset {
    pub dlat: f64,
    pub dlon: f64,
}

/// Meters-per-degree factors valid near one latitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoScale {
    pub m_per_deg_lat: f64,
    pub m_per_deg_lon: f64,
}

impl GeoScale {
    /// Scale factors at the given latitude (degrees)
    pub fn at_latitude(lat: f64) -> Self {
        Self {
            m_per_deg_lat: METERS_PER_DEG,
            m_per_deg_lon: METERS_PER_DEG * lat.to_radians().cos(),
        }
    }

    /// Project `point` to (east, north) meters relative to `origin`
    pub fn to_local(&self, origin: GeoPoint, point: GeoPoint) -> (f64, f64) {
        (
            (point.lon - origin.lon) * self.m_per_deg_lon,
            (point.lat - origin.lat) * self.m_per_deg_lat,
        )
    }

    /// Position reached from `origin` by moving (east, north) meters
    pub fn from_local(&self, origin: GeoPoint, east: f64, north: f64) -> GeoPoint {
        GeoPoint {
            lat: origin.lat + north / self.m_per_deg_lat,
            lon: origin.lon + east / self.m_per_deg_lon,
        }
    }
}

/// A timing gate: a fixed-width segment centered on a calibrated waypoint,
/// perpendicular to the waypoint's heading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gate {
    pub index: u32,
    pub center: GeoPoint,
    /// Endpoint to the left of the direction of travel
    pub left: GeoPoint,
    /// Endpoint to the right of the direction of travel
    pub right: GeoPoint,
    pub heading: f64,
    scale: GeoScale,
}

impl Gate {
    /// Build the gate for a waypoint at `center` facing `heading` (degrees,
    /// clockwise from north)
    pub fn new(index: u32, center: GeoPoint, heading: f64, width_m: f64) -> Self {
        let scale = GeoScale::at_latitude(center.lat);
        let half = width_m / 2.0;

        let endpoint = |bearing_deg: f64| {
            let rad = bearing_deg.to_radians();
            scale.from_local(center, rad.sin() * half, rad.cos() * half)
        };

        Self {
            index,
            center,
            left: endpoint(heading - 90.0),
            right: endpoint(heading + 90.0),
            heading,
            scale,
        }
    }

    /// Test the movement `from -> to` against the gate. Returns the fraction
    /// along the movement at which the gate is crossed.
    pub fn crossed_by(&self, from: GeoPoint, to: GeoPoint) -> Option<f64> {
        let local = |p: GeoPoint| self.scale.to_local(self.center, p);
        segments_cross(local(from), local(to), local(self.left), local(self.right))
    }
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

fn opposite_sides(a: f64, b: f64) -> bool {
    (a > 0.0 && b < 0.0) || (a < 0.0 && b > 0.0)
}

/// Straddle test between segment `p1 -> p2` and segment `q1 -> q2`.
///
/// Each segment's endpoints must lie strictly on opposite sides of the other
/// segment's line, so touching or collinear segments do not count. Returns
/// the fraction along `p1 -> p2` where the crossing happens.
pub fn segments_cross(
    p1: (f64, f64),
    p2: (f64, f64),
    q1: (f64, f64),
    q2: (f64, f64),
) -> Option<f64> {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    if !opposite_sides(d1, d2) {
        return None;
    }

    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);
    if !opposite_sides(d3, d4) {
        return None;
    }

    Some(d1 / (d1 - d2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_perpendicular_crossing() {
        let t = segments_cross((0.0, -1.0), (0.0, 1.0), (-1.0, 0.0), (1.0, 0.0));
        assert!((t.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_never_crosses() {
        assert!(segments_cross((0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)).is_none());
    }

    #[test]
    fn test_touching_endpoint_is_not_crossing() {
        assert!(segments_cross((0.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (1.0, 0.0)).is_none());
    }

    #[test]
    fn test_miss_beyond_gate_end() {
        assert!(segments_cross((5.0, -1.0), (5.0, 1.0), (-1.0, 0.0), (1.0, 0.0)).is_none());
    }

    #[test]
    fn test_gate_width_and_orientation() {
        let center = GeoPoint::new(35.0, 139.0);
        let gate = Gate::new(0, center, 90.0, 7.0);
        let scale = GeoScale::at_latitude(35.0);

        // Heading east: the gate runs north-south, left endpoint to the north
        let (le, ln) = scale.to_local(center, gate.left);
        let (re, rn) = scale.to_local(center, gate.right);
        assert!(le.abs() < 1e-6 && re.abs() < 1e-6);
        assert!((ln - 3.5).abs() < 1e-6);
        assert!((rn + 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_longitude_scale_shrinks_with_latitude() {
        let equator = GeoScale::at_latitude(0.0);
        let japan = GeoScale::at_latitude(35.0);
        assert!((equator.m_per_deg_lon - 111_320.0).abs() < 1e-6);
        assert!((japan.m_per_deg_lon - 111_320.0 * 35f64.to_radians().cos()).abs() < 1e-6);
        assert_eq!(japan.m_per_deg_lat, 111_320.0);
    }

    proptest! {
        #[test]
        fn prop_through_center_detected_both_ways(
            heading in 0.0f64..360.0,
            approach in -60.0f64..60.0,
            lat in -60.0f64..60.0,
            reach in 2.0f64..50.0,
        ) {
            let center = GeoPoint::new(lat, 10.0);
            let gate = Gate::new(1, center, heading, 7.0);
            let scale = GeoScale::at_latitude(lat);
            let dir = (heading + approach).to_radians();
            let before = scale.from_local(center, -dir.sin() * reach, -dir.cos() * reach);
            let after = scale.from_local(center, dir.sin() * reach, dir.cos() * reach);

            prop_assert!(gate.crossed_by(before, after).is_some());
            prop_assert!(gate.crossed_by(after, before).is_some());
        }

        #[test]
        fn prop_one_side_never_flagged(
            heading in 0.0f64..360.0,
            lateral_a in -20.0f64..20.0,
            lateral_b in -20.0f64..20.0,
            ahead_a in 0.5f64..30.0,
            ahead_b in 0.5f64..30.0,
        ) {
            let center = GeoPoint::new(35.0, 139.0);
            let gate = Gate::new(0, center, heading, 7.0);
            let scale = GeoScale::at_latitude(35.0);
            let fwd = heading.to_radians();
            let side = (heading + 90.0).to_radians();
            let place = |ahead: f64, lateral: f64| {
                scale.from_local(
                    center,
                    fwd.sin() * ahead + side.sin() * lateral,
                    fwd.cos() * ahead + side.cos() * lateral,
                )
            };

            prop_assert!(gate.crossed_by(place(ahead_a, lateral_a), place(ahead_b, lateral_b)).is_none());
        }
    }
}
