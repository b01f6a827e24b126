// src/error.rs
//! Error types for the geoid monitor

use std::fmt;

pub type Result<T> = std::result::Result<T, GeoidError>;

#[derive(Debug)]
pub enum GeoidError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Connection(String),
    Parse(String),
    Grid(String),
    Config(String),
    Other(String),
}

impl fmt::Display for GeoidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoidError::Io(e) => write!(f, "IO error: {}", e),
            GeoidError::Serial(e) => write!(f, "Serial error: {}", e),
            GeoidError::Json(e) => write!(f, "JSON error: {}", e),
            GeoidError::Connection(msg) => write!(f, "Connection error: {}", msg),
            GeoidError::Parse(msg) => write!(f, "Parse error: {}", msg),
            GeoidError::Grid(msg) => write!(f, "Geoid grid error: {}", msg),
            GeoidError::Config(msg) => write!(f, "Config error: {}", msg),
            GeoidError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for GeoidError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoidError::Io(e) => Some(e),
            GeoidError::Serial(e) => Some(e),
            GeoidError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GeoidError {
    fn from(error: std::io::Error) -> Self {
        GeoidError::Io(error)
    }
}

impl From<tokio_serial::Error> for GeoidError {
    fn from(error: tokio_serial::Error) -> Self {
        GeoidError::Serial(error)
    }
}

impl From<serde_json::Error> for GeoidError {
    fn from(error: serde_json::Error) -> Self {
        GeoidError::Json(error)
    }
}

impl From<anyhow::Error> for GeoidError {
    fn from(error: anyhow::Error) -> Self {
        GeoidError::Other(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = GeoidError::Grid("expected 2076480 bytes".to_string());
        assert_eq!(err.to_string(), "Geoid grid error: expected 2076480 bytes");

        let err = GeoidError::Connection("refused".to_string());
        assert_eq!(err.to_string(), "Connection error: refused");
    }

    #[test]
    fn test_io_source_is_kept() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: GeoidError = io.into();
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_anyhow() {
        let err: GeoidError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, GeoidError::Other(ref m) if m == "boom"));
    }
}
