// src/gps/mod.rs
//! NMEA sentence handling and gpsd access

pub mod data;
pub mod gpsd;
pub mod nmea;

pub use data::GgaFix;
