use serde::{Deserialize, Serialize};

use super::Coordinate;

/// A routed path from origin to destination
///
/// `is_fallback` marks the straight two-point line substituted when the routing
/// service could not produce a route; distance and duration are zero then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub path: Vec<Coordinate>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub is_fallback: bool,
}

impl RouteResult {
    pub fn fallback(origin: Coordinate, destination: Coordinate) -> Self {
        Self {
            path: vec![origin, destination],
            distance_meters: 0.0,
            duration_seconds: 0.0,
            is_fallback: true,
        }
    }

    /// Routed duration rounded up to whole minutes, never below one
    pub fn duration_minutes(&self) -> u32 {
        (self.duration_seconds / 60.0).ceil().max(1.0) as u32
    }
}

// ============================================================================
// OSRM API Types
// ============================================================================

/// Response of `GET /route/v1/{profile}/{coordinates}?geometries=geojson`
#[derive(Debug, Clone, Deserialize)]
pub struct OsrmResponse {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsrmRoute {
    pub distance: f64,
    pub duration: f64,
    pub geometry: OsrmGeometry,
}

/// GeoJSON LineString; positions are `[lng, lat]`
#[derive(Debug, Clone, Deserialize)]
pub struct OsrmGeometry {
    pub coordinates: Vec<[f64; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_straight_line() {
        let origin = Coordinate::new(37.5665, 126.9780);
        let destination = Coordinate::new(37.5700, 126.9830);
        let route = RouteResult::fallback(origin, destination);

        assert!(route.is_fallback);
        assert_eq!(route.path, vec![origin, destination]);
        assert_eq!(route.distance_meters, 0.0);
        assert_eq!(route.duration_minutes(), 1);
    }

    #[test]
    fn test_duration_minutes_rounds_up() {
        let route = RouteResult {
            path: vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.01)],
            distance_meters: 1100.0,
            duration_seconds: 61.0,
            is_fallback: false,
        };
        assert_eq!(route.duration_minutes(), 2);
    }

    #[test]
    fn test_zero_duration_route_shows_one_minute() {
        let here = Coordinate::new(37.5665, 126.9780);
        let route = RouteResult {
            path: vec![here, here],
            distance_meters: 0.0,
            duration_seconds: 0.0,
            is_fallback: false,
        };
        assert_eq!(route.duration_minutes(), 1);
    }
}
