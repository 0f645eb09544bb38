use serde::{Deserialize, Serialize};

mod candidate;
mod recommendation;
mod route;

pub use candidate::{Candidate, LooseNumber, RawPlace, SavedVenue, MISSING_CATEGORY, MISSING_PHONE};
pub use recommendation::{RecommendationMode, RecommendationState};
pub use route::{OsrmGeometry, OsrmResponse, OsrmRoute, RouteResult};

/// Map center used when no device location is known (Seoul City Hall)
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    lat: 37.5665,
    lng: 126.9780,
};

/// A WGS84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns true if both components are finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub(crate) fn to_radians(self) -> (f64, f64) {
        (self.lat.to_radians(), self.lng.to_radians())
    }
}

/// Heuristic walking/driving ETA in whole minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelTime {
    pub walking_min: u32,
    pub driving_min: u32,
}

impl TravelTime {
    pub fn for_mode(&self, mode: TravelMode) -> u32 {
        match mode {
            TravelMode::Walking => self.walking_min,
            TravelMode::Driving => self.driving_min,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walking,
    Driving,
}

impl TravelMode {
    /// Profile segment understood by the routing service
    pub fn profile(&self) -> &'static str {
        match self {
            TravelMode::Walking => "foot",
            TravelMode::Driving => "driving",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(0.0, 0.0).is_valid());
        assert!(Coordinate::new(90.0, 180.0).is_valid());
        assert!(DEFAULT_CENTER.is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_travel_mode_profiles() {
        assert_eq!(TravelMode::Walking.profile(), "foot");
        assert_eq!(TravelMode::Driving.profile(), "driving");
    }

    #[test]
    fn test_travel_mode_deserialization() {
        let mode: TravelMode = serde_json::from_str("\"walking\"").unwrap();
        assert_eq!(mode, TravelMode::Walking);
    }
}
