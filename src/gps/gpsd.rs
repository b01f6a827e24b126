// src/gps/gpsd.rs
//! GPSD client in raw NMEA watch mode

use crate::error::{GeoidError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::TcpStream,
};

/// WATCH command asking gpsd to relay the raw NMEA stream of its devices
pub const WATCH_NMEA: &str = "?WATCH={\"enable\":true,\"nmea\":true}\n";

#[derive(Debug, Deserialize)]
struct GpsdMessage {
    class: String,
    #[serde(flatten)]
    data: HashMap<String, serde_json::Value>,
}

/// What a single line from gpsd turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum GpsdLine<'a> {
    /// A raw NMEA sentence to feed the extractor
    Sentence(&'a str),
    /// gpsd release string from the VERSION object
    Version(String),
    /// Any other JSON report
    Report(String),
}

/// Connect to a gpsd daemon and return a stream reader
pub async fn connect_gpsd(host: &str, port: u16) -> Result<BufReader<TcpStream>> {
    let mut stream = TcpStream::connect(format!("{}:{}", host, port))
        .await
        .map_err(|e| GeoidError::Connection(format!("Failed to connect to gpsd at {}:{}: {}", host, port, e)))?;

    stream
        .write_all(WATCH_NMEA.as_bytes())
        .await
        .map_err(|e| GeoidError::Connection(format!("Failed to send WATCH command: {}", e)))?;

    Ok(BufReader::new(stream))
}

/// Classify a line received from gpsd.
///
/// In NMEA watch mode gpsd interleaves its own JSON objects (VERSION,
/// DEVICES, WATCH) with the relayed sentences.
pub fn classify_line(line: &str) -> Result<GpsdLine<'_>> {
    if !line.starts_with('{') {
        return Ok(GpsdLine::Sentence(line));
    }

    let msg: GpsdMessage = serde_json::from_str(line)
        .map_err(|e| GeoidError::Parse(format!("Failed to parse gpsd JSON: {}", e)))?;

    match msg.class.as_str() {
        "VERSION" => {
            let release = msg
                .data
                .get("release")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            Ok(GpsdLine::Version(release))
        }
        _ => Ok(GpsdLine::Report(msg.class)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_passthrough() {
        let line = "$GNGGA,212716.00,4850.676296,N,01005.195966,E,1,09,1.0,446.2,M,47.9,M,,*76";
        assert_eq!(classify_line(line).unwrap(), GpsdLine::Sentence(line));
    }

    #[test]
    fn test_version_parsing() {
        let json = r#"{"class":"VERSION","release":"3.25","rev":"3.25","proto_major":3,"proto_minor":15}"#;
        assert_eq!(classify_line(json).unwrap(), GpsdLine::Version("3.25".to_string()));
    }

    #[test]
    fn test_other_reports() {
        let json = r#"{"class":"DEVICES","devices":[{"path":"/dev/ttyUSB0"}]}"#;
        assert_eq!(classify_line(json).unwrap(), GpsdLine::Report("DEVICES".to_string()));
    }

    #[test]
    fn test_invalid_json() {
        let result = classify_line(r#"{"invalid": json"#);
        assert!(matches!(result, Err(GeoidError::Parse(_))));
    }

    #[test]
    fn test_watch_command_requests_nmea() {
        assert!(WATCH_NMEA.contains("\"nmea\":true"));
        assert!(WATCH_NMEA.ends_with('\n'));
    }
}
