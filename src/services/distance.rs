//! Great-circle distance and heuristic travel time.

use crate::models::{Coordinate, TravelTime};

/// Earth's mean radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Average walking speed, 4 km/h.
pub const WALKING_METERS_PER_MIN: f64 = 67.0;

/// Average urban driving speed, 25 km/h.
pub const DRIVING_METERS_PER_MIN: f64 = 417.0;

/// Haversine distance between two coordinates in meters.
///
/// ```
/// use venue_picker_api::models::Coordinate;
/// use venue_picker_api::services::distance::distance_meters;
///
/// let city_hall = Coordinate::new(37.5665, 126.9780);
/// let north = Coordinate::new(37.5765, 126.9780);
/// assert!((distance_meters(city_hall, north) - 1112.0).abs() < 5.0);
/// ```
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lng1) = a.to_radians();
    let (lat2, lng2) = b.to_radians();

    let d_lat = lat2 - lat1;
    let d_lng = lng2 - lng1;

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Walking and driving ETA for a distance, never below one minute.
pub fn estimate_travel_time(distance_meters: f64) -> TravelTime {
    TravelTime {
        walking_min: minutes_at(distance_meters, WALKING_METERS_PER_MIN),
        driving_min: minutes_at(distance_meters, DRIVING_METERS_PER_MIN),
    }
}

fn minutes_at(distance_meters: f64, meters_per_min: f64) -> u32 {
    // f64::max discards NaN, so garbage input also lands on the one-minute floor
    (distance_meters / meters_per_min).round().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const CITY_HALL: Coordinate = Coordinate::new(37.5665, 126.9780);
    const BUSAN: Coordinate = Coordinate::new(35.1796, 129.0756);
    const NEW_YORK: Coordinate = Coordinate::new(40.7128, -74.0060);

    #[test]
    fn test_same_point_zero_distance() {
        assert_eq!(distance_meters(CITY_HALL, CITY_HALL), 0.0);
        assert_eq!(distance_meters(NEW_YORK, NEW_YORK), 0.0);
    }

    #[test]
    fn test_symmetry() {
        let pairs = [(CITY_HALL, BUSAN), (BUSAN, NEW_YORK), (NEW_YORK, CITY_HALL)];
        for (a, b) in pairs {
            assert!((distance_meters(a, b) - distance_meters(b, a)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_hundredth_degree_of_latitude() {
        let north = Coordinate::new(CITY_HALL.lat + 0.01, CITY_HALL.lng);
        let distance = distance_meters(CITY_HALL, north);
        assert!((distance - 1113.0).abs() < 5.0, "got {}", distance);
    }

    #[test]
    fn test_seoul_to_busan() {
        // ~325 km as the crow flies
        let distance = distance_meters(CITY_HALL, BUSAN);
        assert!((distance - 325_000.0).abs() < 5_000.0, "got {}", distance);
    }

    #[test]
    fn test_travel_time_floor() {
        assert_eq!(
            estimate_travel_time(0.0),
            TravelTime {
                walking_min: 1,
                driving_min: 1
            }
        );
        assert_eq!(estimate_travel_time(20.0).walking_min, 1);
        assert_eq!(estimate_travel_time(f64::NAN).driving_min, 1);
    }

    #[test]
    fn test_travel_time_scales_with_distance() {
        let eta = estimate_travel_time(6700.0);
        assert_eq!(eta.walking_min, 100);
        assert_eq!(eta.driving_min, 16);
    }
}
