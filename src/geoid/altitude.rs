// src/geoid/altitude.rs
//! Conversions between ellipsoidal and mean-sea-level heights

pub const METERS_PER_FOOT: f64 = 0.3048;

pub fn meters_to_feet(meters: f64) -> f64 {
    meters / METERS_PER_FOOT
}

pub fn feet_to_meters(feet: f64) -> f64 {
    feet * METERS_PER_FOOT
}

/// Height above mean sea level from a WGS84 ellipsoidal height
pub fn msl_from_ellipsoidal(ellipsoidal_m: f64, separation_m: f64) -> f64 {
    ellipsoidal_m - separation_m
}

/// WGS84 ellipsoidal height from a height above mean sea level
pub fn ellipsoidal_from_msl(msl_m: f64, separation_m: f64) -> f64 {
    msl_m + separation_m
}

/// Geoid corrected altitude in whole feet.
///
/// Both terms are converted and rounded separately, so the result matches
/// what a pilot sees when the separation is displayed next to it.
pub fn true_altitude_feet(raw_altitude_m: f64, separation_m: f64) -> i64 {
    let separation_ft = meters_to_feet(separation_m).round();
    (meters_to_feet(raw_altitude_m) - separation_ft).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feet_conversion() {
        assert!((meters_to_feet(0.3048) - 1.0).abs() < 1e-12);
        assert!((feet_to_meters(1000.0) - 304.8).abs() < 1e-9);
    }

    #[test]
    fn test_msl_round_trip() {
        let msl = msl_from_ellipsoidal(494.1, 47.9);
        assert!((msl - 446.2).abs() < 1e-9);
        assert!((ellipsoidal_from_msl(msl, 47.9) - 494.1).abs() < 1e-9);
    }

    #[test]
    fn test_true_altitude() {
        // 494.1 m = 1621.06 ft, 47.9 m = 157.15 ft -> 157 ft
        assert_eq!(true_altitude_feet(494.1, 47.9), 1464);
        assert_eq!(true_altitude_feet(100.0, 0.0), 328);
    }
}
