//! Great-circle geometry on a spherical earth

use crate::models::Position;

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per second in one knot
pub const KNOT_MS: f64 = 0.514_444;

/// Haversine distance in meters
pub fn distance_m(a: &Position, b: &Position) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial bearing from `from` to `to`, degrees in [0, 360)
pub fn bearing_deg(from: &Position, to: &Position) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlon = (to.lon - from.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Smallest absolute difference between two headings, in [0, 180]
pub fn angle_diff_deg(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Position `meters` north (negative: south) of `origin` along its meridian
pub fn offset_north(origin: &Position, meters: f64) -> Position {
    let dlat = (meters / EARTH_RADIUS_M).to_degrees();
    Position::new(origin.lat + dlat, origin.lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_along_meridian() {
        let origin = Position::new(58.28, 12.28);
        let north = offset_north(&origin, 1_000.0);
        let d = distance_m(&origin, &north);
        assert!((d - 1_000.0).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn distance_is_zero_for_same_point() {
        let p = Position::new(58.28, 12.28);
        assert_eq!(distance_m(&p, &p), 0.0);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = Position::new(58.28, 12.28);
        let north = offset_north(&origin, 500.0);
        let south = offset_north(&origin, -500.0);
        let east = Position::new(58.28, 12.29);

        assert!(bearing_deg(&origin, &north) < 0.01 || bearing_deg(&origin, &north) > 359.99);
        assert!((bearing_deg(&origin, &south) - 180.0).abs() < 0.01);
        assert!((bearing_deg(&origin, &east) - 90.0).abs() < 0.1);
    }

    #[test]
    fn angle_diff_wraps() {
        assert_eq!(angle_diff_deg(350.0, 10.0), 20.0);
        assert_eq!(angle_diff_deg(10.0, 350.0), 20.0);
        assert_eq!(angle_diff_deg(0.0, 180.0), 180.0);
        assert_eq!(angle_diff_deg(90.0, 90.0), 0.0);
    }
}
