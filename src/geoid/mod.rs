// src/geoid/mod.rs
//! Geoid separation: the NMEA driven cache, the EGM96 model and height conversions

pub mod altitude;
pub mod egm96;
pub mod extractor;

pub use egm96::Egm96Grid;
pub use extractor::{ExtractorConfig, GeoidSample, GeoidSeparationExtractor, Rejection};
