// src/lib.rs
//! Geoid Monitor Library
//!
//! Tracks the geoid separation reported in NMEA GGA sentences, debounced and
//! filtered by fix precision, and offers an EGM96 grid model for comparison.

pub mod config;
pub mod display;
pub mod error;
pub mod geoid;
pub mod gps;
pub mod listener;
pub mod monitor;

// Re-export main types for convenience
pub use error::{GeoidError, Result};
pub use geoid::{Egm96Grid, ExtractorConfig, GeoidSample, GeoidSeparationExtractor, Rejection};
pub use gps::GgaFix;
pub use listener::{ListenerRegistration, NmeaListener, PermissionCheck};
pub use monitor::{GeoidMonitor, SentenceSource};
