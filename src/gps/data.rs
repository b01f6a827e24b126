// src/gps/data.rs
//! GGA fix data structures

use serde::{Deserialize, Serialize};

/// Field positions within a GGA sentence.
///
/// These follow the NMEA 0183 GGA layout and never shift:
/// `$GPGGA,time,lat,N/S,lon,E/W,quality,sats,hdop,alt,M,geoid,M,age,station*cs`
pub mod gga_field {
    pub const TALKER: usize = 0;
    pub const TIME: usize = 1;
    pub const LATITUDE: usize = 2;
    pub const LAT_HEMISPHERE: usize = 3;
    pub const LONGITUDE: usize = 4;
    pub const LON_HEMISPHERE: usize = 5;
    pub const FIX_QUALITY: usize = 6;
    pub const SATELLITES: usize = 7;
    pub const HDOP: usize = 8;
    pub const ALTITUDE: usize = 9;
    pub const GEOID: usize = 11;

    /// A GGA sentence must carry at least this many fields to reach the geoid.
    pub const MIN_FIELDS: usize = 12;
}

/// Decoded GGA (Global Positioning System Fix Data) sentence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GgaFix {
    pub talker: String,
    pub utc_time: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fix_quality: Option<u8>,
    pub satellites: Option<u8>,
    pub hdop: Option<f64>,
    pub altitude: Option<f64>, // meters above mean sea level
    pub geoid_separation: Option<f64>, // meters, geoid above WGS84 ellipsoid
}

impl GgaFix {
    /// Check if the fix carries a position
    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Ellipsoidal height, when both altitude and separation are present
    pub fn ellipsoidal_height(&self) -> Option<f64> {
        match (self.altitude, self.geoid_separation) {
            (Some(alt), Some(sep)) => Some(alt + sep),
            _ => None,
        }
    }

    /// Get fix type description
    pub fn fix_description(&self) -> String {
        match self.fix_quality {
            Some(0) => "No fix".to_string(),
            Some(1) => "GPS".to_string(),
            Some(2) => "DGPS".to_string(),
            Some(3) => "PPS".to_string(),
            Some(4) => "RTK".to_string(),
            Some(5) => "Float RTK".to_string(),
            Some(6) => "Estimated".to_string(),
            Some(7) => "Manual".to_string(),
            Some(8) => "Simulation".to_string(),
            Some(q) => format!("Unknown ({})", q),
            None => "Unknown".to_string(),
        }
    }

    /// Format coordinate for display
    pub fn format_coordinate(coord: Option<f64>) -> String {
        match coord {
            Some(val) => format!("{:>12.6}°", val),
            None => "No fix".to_string(),
        }
    }

    /// Format value with unit for display
    pub fn format_value<T: std::fmt::Display>(value: Option<T>, unit: &str) -> String {
        match value {
            Some(val) => format!("{:>12} {}", val, unit),
            None => "Unknown".to_string(),
        }
    }
}
