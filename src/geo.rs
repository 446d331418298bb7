// Copyright (c) 2025 - Riverwatch Project
//! Great-circle geometry helpers

/// Mean Earth radius in kilometres
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two WGS84 points, in kilometres.
///
/// Haversine formulation; accurate to well under 0.5% at the scales the
/// clustering radius operates on (tens of kilometres).
pub fn great_circle_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(great_circle_km(51.5, -2.6, 51.5, -2.6), 0.0);
    }

    #[test]
    fn known_distance_bristol_to_cardiff() {
        // Bristol (51.4545, -2.5879) to Cardiff (51.4816, -3.1791) is ~41 km
        let d = great_circle_km(51.4545, -2.5879, 51.4816, -3.1791);
        assert!((d - 41.2).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn symmetric() {
        let a = great_circle_km(51.08, -2.87, 51.12, -2.82);
        let b = great_circle_km(51.12, -2.82, 51.08, -2.87);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn one_degree_latitude_is_about_111_km() {
        let d = great_circle_km(50.0, 0.0, 51.0, 0.0);
        assert!((d - 111.2).abs() < 0.5, "got {}", d);
    }
}
