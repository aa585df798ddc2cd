use courier_proto::Coordinate;
use serde::{Deserialize, Serialize};

/// Roughly 2 m in degrees of latitude.
pub const DEFAULT_ZONE_SIZE_DEG: f64 = 0.000018;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneCfg {
    /// Full edge length of the square zone, in degrees.
    #[serde(default = "default_zone_size")]
    pub size_deg: f64,
}

fn default_zone_size() -> f64 {
    DEFAULT_ZONE_SIZE_DEG
}

impl Default for ZoneCfg {
    fn default() -> Self {
        Self { size_deg: DEFAULT_ZONE_SIZE_DEG }
    }
}

/// Rectangular operating zone. Built once per session and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    min_lat: f64,
    min_lng: f64,
    max_lat: f64,
    max_lng: f64,
}

impl Geofence {
    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self {
            min_lat: min_lat.min(max_lat),
            min_lng: min_lng.min(max_lng),
            max_lat: min_lat.max(max_lat),
            max_lng: min_lng.max(max_lng),
        }
    }

    /// Square of edge `size_deg` centred on `center`.
    pub fn around(center: Coordinate, size_deg: f64) -> Self {
        let half = size_deg.abs() / 2.0;
        Self::new(center.lat - half, center.lng - half, center.lat + half, center.lng + half)
    }

    /// Boundary inclusive, matching the rectangle drawn on the map.
    pub fn contains(&self, p: Coordinate) -> bool {
        p.lat >= self.min_lat && p.lat <= self.max_lat && p.lng >= self.min_lng && p.lng <= self.max_lng
    }

    pub fn south_west(&self) -> Coordinate {
        Coordinate::new(self.min_lat, self.min_lng)
    }

    pub fn north_east(&self) -> Coordinate {
        Coordinate::new(self.max_lat, self.max_lng)
    }

    pub fn center(&self) -> Coordinate {
        self.south_west().lerp(self.north_east(), 0.5)
    }

    /// Approximate edge lengths in meters (north-south, east-west).
    pub fn extent_m(&self) -> (f64, f64) {
        let sw = self.south_west();
        let ns = sw.distance_m(&Coordinate::new(self.max_lat, self.min_lng));
        let ew = sw.distance_m(&Coordinate::new(self.min_lat, self.max_lng));
        (ns, ew)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_zone() -> Geofence {
        Geofence::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn interior_and_exterior_points() {
        let z = unit_zone();
        assert!(z.contains(Coordinate::new(1.0, 1.0)));
        assert!(z.contains(Coordinate::new(5.0, 9.999)));
        assert!(!z.contains(Coordinate::new(-0.001, 5.0)));
        assert!(!z.contains(Coordinate::new(5.0, 10.001)));
        assert!(!z.contains(Coordinate::new(11.0, 11.0)));
    }

    #[test]
    fn boundary_is_inside() {
        let z = unit_zone();
        assert!(z.contains(Coordinate::new(0.0, 0.0)));
        assert!(z.contains(Coordinate::new(10.0, 10.0)));
        assert!(z.contains(Coordinate::new(0.0, 10.0)));
        assert!(z.contains(Coordinate::new(10.0, 3.0)));
    }

    #[test]
    fn nan_is_never_inside() {
        assert!(!unit_zone().contains(Coordinate::new(f64::NAN, 1.0)));
    }

    #[test]
    fn around_is_centred_square() {
        let c = Coordinate::new(48.137, 11.575);
        let z = Geofence::around(c, DEFAULT_ZONE_SIZE_DEG);
        assert!(z.contains(c));
        assert!(z.center().distance_m(&c) < 1e-6);
        let (ns, _ew) = z.extent_m();
        assert!((ns - 2.0).abs() < 0.05, "ns={}", ns);
        assert!(!z.contains(Coordinate::new(c.lat + DEFAULT_ZONE_SIZE_DEG, c.lng)));
    }

    #[test]
    fn corners_are_normalised() {
        let z = Geofence::new(10.0, 10.0, 0.0, 0.0);
        assert_eq!(z, unit_zone());
    }
}
