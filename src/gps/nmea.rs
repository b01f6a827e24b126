// src/gps/nmea.rs
//! NMEA sentence parsing

use super::data::{gga_field, GgaFix};
use std::str::FromStr;

/// Split a sentence into its comma separated fields.
///
/// The checksum stays attached to the last field, as it does on the wire.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').collect()
}

/// True for the two talker variants of a GGA fix sentence
pub fn is_gga_talker(field: &str) -> bool {
    field.eq_ignore_ascii_case("$GPGGA") || field.eq_ignore_ascii_case("$GNGGA")
}

/// Parse a numeric field.
///
/// Surrounding whitespace is ignored. Anything else that is not part of the
/// number, including a `*hh` checksum, makes the field unparseable. `NaN`
/// and infinities count as unparseable too.
pub fn parse_number<T>(field: &str) -> Option<T>
where
    T: FromStr + Into<f64> + Copy,
{
    let value = field.trim();
    if value.is_empty() {
        return None;
    }
    let parsed = value.parse::<T>().ok()?;
    if parsed.into().is_finite() {
        Some(parsed)
    } else {
        None
    }
}

/// Drop a trailing `*hh` checksum from a whole sentence
fn strip_checksum(line: &str) -> &str {
    line.rsplit_once('*').map_or(line, |(body, _)| body)
}

/// Parse a GGA (Global Positioning System Fix Data) sentence
pub fn parse_gga(line: &str) -> Option<GgaFix> {
    let parts = split_fields(strip_checksum(line.trim()));

    if parts.len() < gga_field::MIN_FIELDS || !is_gga_talker(parts[gga_field::TALKER]) {
        return None;
    }

    let time = parts[gga_field::TIME];

    Some(GgaFix {
        talker: parts[gga_field::TALKER].trim_start_matches('$').to_ascii_uppercase(),
        utc_time: (!time.is_empty()).then(|| time.to_string()),
        latitude: parse_coordinate(parts[gga_field::LATITUDE], parts[gga_field::LAT_HEMISPHERE], "S"),
        longitude: parse_coordinate(parts[gga_field::LONGITUDE], parts[gga_field::LON_HEMISPHERE], "W"),
        fix_quality: parse_number(parts[gga_field::FIX_QUALITY]),
        satellites: parse_number(parts[gga_field::SATELLITES]),
        hdop: parse_number(parts[gga_field::HDOP]),
        altitude: parse_number(parts[gga_field::ALTITUDE]),
        geoid_separation: parse_number(parts[gga_field::GEOID]),
    })
}

/// Convert an NMEA `ddmm.mmmm` / `dddmm.mmmm` value to signed decimal degrees
fn parse_coordinate(value: &str, hemisphere: &str, negative: &str) -> Option<f64> {
    if value.is_empty() || hemisphere.is_empty() {
        return None;
    }
    let raw: f64 = parse_number(value)?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;
    if hemisphere.eq_ignore_ascii_case(negative) {
        Some(-decimal)
    } else {
        Some(decimal)
    }
}

/// Verify the `*hh` checksum of a sentence.
///
/// Returns `None` when the sentence carries no checksum at all.
pub fn verify_checksum(line: &str) -> Option<bool> {
    let line = line.trim();
    let body = line.strip_prefix('$').or_else(|| line.strip_prefix('!'))?;
    let (payload, checksum) = body.rsplit_once('*')?;
    let expected = u8::from_str_radix(checksum.get(..2)?, 16).ok()?;
    let actual = payload.bytes().fold(0u8, |acc, b| acc ^ b);
    Some(actual == expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MUNICH: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const ULM: &str = "$GPGGA,212716.00,4850.676296,N,01005.195966,E,1,09,1.0,446.2,M,47.9,M,,*76";

    #[test]
    fn test_gga_parsing() {
        let fix = parse_gga(MUNICH).unwrap();

        assert_eq!(fix.talker, "GPGGA");
        assert_eq!(fix.utc_time.as_deref(), Some("123519"));
        assert!((fix.latitude.unwrap() - 48.1173).abs() < 1e-4);
        assert!((fix.longitude.unwrap() - 11.516_666).abs() < 1e-4);
        assert_eq!(fix.fix_quality, Some(1));
        assert_eq!(fix.satellites, Some(8));
        assert_eq!(fix.hdop, Some(0.9));
        assert_eq!(fix.altitude, Some(545.4));
        assert_eq!(fix.geoid_separation, Some(46.9));
    }

    #[test]
    fn test_southern_western_hemispheres() {
        let line = "$GNGGA,000000,3351.000,S,15112.000,W,1,05,1.2,10.0,M,22.5,M,,";
        let fix = parse_gga(line).unwrap();
        assert!(fix.latitude.unwrap() < 0.0);
        assert!(fix.longitude.unwrap() < 0.0);
        assert_eq!(fix.talker, "GNGGA");
    }

    #[test]
    fn test_empty_fix_sentence() {
        let fix = parse_gga("$GPGGA,,,,,,0,,,,,,,,").unwrap();
        assert!(!fix.has_position());
        assert_eq!(fix.fix_quality, Some(0));
        assert_eq!(fix.hdop, None);
        assert_eq!(fix.geoid_separation, None);
    }

    #[test]
    fn test_lowercase_talker_accepted() {
        assert!(is_gga_talker("$gpgga"));
        assert!(is_gga_talker("$GnGgA"));
        assert!(!is_gga_talker("$GPRMC"));
        assert!(!is_gga_talker("GPGGA"));
    }

    #[test]
    fn test_invalid_sentence() {
        assert!(parse_gga("$INVALID,123,456").is_none());
        assert!(parse_gga("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A").is_none());
        assert!(parse_gga("").is_none());
    }

    #[test]
    fn test_checksum_on_last_field_is_dropped_for_display() {
        let line = "$GPGGA,212716.00,4850.676296,N,01005.195966,E,1,09,1.0,446.2,M,47.9*76";
        let fix = parse_gga(line).unwrap();
        assert_eq!(fix.geoid_separation, Some(47.9));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number::<f64>(" 1.5 "), Some(1.5));
        assert_eq!(parse_number::<f64>("47.9*76"), None);
        assert_eq!(parse_number::<f64>("1.0*zz"), None);
        assert_eq!(parse_number::<f64>(""), None);
        assert_eq!(parse_number::<f64>("abc"), None);
        assert_eq!(parse_number::<f64>("NaN"), None);
        assert_eq!(parse_number::<f64>("inf"), None);
        assert_eq!(parse_number::<u8>("08"), Some(8));
    }

    #[test]
    fn test_checksum() {
        assert_eq!(verify_checksum(MUNICH), Some(true));
        assert_eq!(verify_checksum(ULM), Some(false));
        assert_eq!(verify_checksum("$GPGGA,,,,,,0,,,,,,,,"), None);
        assert_eq!(verify_checksum("no dollar*00"), None);
    }
}
