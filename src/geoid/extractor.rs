// src/geoid/extractor.rs
//! Debounced geoid separation tracking from GGA sentences
//!
//! The extractor watches a stream of raw NMEA sentences and keeps the last
//! known good geoid separation. A sentence is only looked at when the
//! debounce interval has elapsed since the last accepted one, and only a
//! well formed GGA fix with a good enough HDOP updates the cached value.
//! Every other input is dropped without touching the cache.

use crate::gps::{data::gga_field, nmea};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        PoisonError, RwLock,
    },
};
use tracing::{debug, info, trace};

/// Minimum time between two accepted sentences, in milliseconds
pub const DEBOUNCE_MS: i64 = 10_000;

/// Fixes with an HDOP above this are considered unreliable
pub const MAX_HDOP: f64 = 20.0;

/// Tuning knobs of the extractor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub debounce_ms: i64,
    pub max_hdop: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            max_hdop: MAX_HDOP,
        }
    }
}

/// Why a sentence did not update the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyMessage,
    Debounced,
    TooFewFields(usize),
    NotGga,
    EmptyField,
    InvalidPrecision,
    InsufficientPrecision,
    InvalidSeparation,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::EmptyMessage => write!(f, "empty message"),
            Rejection::Debounced => write!(f, "within debounce interval"),
            Rejection::TooFewFields(n) => write!(f, "only {} fields", n),
            Rejection::NotGga => write!(f, "not a GGA sentence"),
            Rejection::EmptyField => write!(f, "HDOP or geoid field empty"),
            Rejection::InvalidPrecision => write!(f, "HDOP not numeric"),
            Rejection::InsufficientPrecision => write!(f, "HDOP above threshold"),
            Rejection::InvalidSeparation => write!(f, "geoid separation not numeric"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct GeoidCache {
    separation_meters: f64,
    last_update_timestamp: i64,
    valid: bool,
}

/// Point-in-time view of the extractor state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoidSample {
    pub separation_meters: f64,
    pub last_update_timestamp: i64,
    pub valid: bool,
    pub accepted_count: u64,
    pub rejected_count: u64,
}

/// Geoid separation extractor with a debounced cache
#[derive(Debug)]
pub struct GeoidSeparationExtractor {
    config: ExtractorConfig,
    cache: RwLock<GeoidCache>,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl GeoidSeparationExtractor {
    /// Create an extractor with the default debounce interval and HDOP threshold
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        Self {
            config,
            cache: RwLock::new(GeoidCache::default()),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> ExtractorConfig {
        self.config
    }

    /// Feed one sentence. Unusable input is dropped silently.
    pub fn on_sentence(&self, message: &str, timestamp_ms: i64) {
        let _ = self.evaluate(message, timestamp_ms);
    }

    /// Feed one sentence and report whether it was accepted.
    ///
    /// On success the newly cached separation is returned.
    pub fn evaluate(&self, message: &str, timestamp_ms: i64) -> Result<f64, Rejection> {
        match self.try_accept(message, timestamp_ms) {
            Ok(separation) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
                info!(separation, timestamp_ms, "geoid separation updated");
                Ok(separation)
            }
            Err(reason) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                if reason == Rejection::Debounced {
                    trace!(timestamp_ms, "sentence debounced");
                } else {
                    debug!(%reason, timestamp_ms, "sentence rejected");
                }
                Err(reason)
            }
        }
    }

    /// Last accepted separation in meters, `0.0` before the first accepted fix
    pub fn current_separation(&self) -> f64 {
        self.read_cache().separation_meters
    }

    /// True once any sentence has been accepted
    pub fn is_valid(&self) -> bool {
        self.read_cache().valid
    }

    pub fn snapshot(&self) -> GeoidSample {
        let cache = self.read_cache();
        GeoidSample {
            separation_meters: cache.separation_meters,
            last_update_timestamp: cache.last_update_timestamp,
            valid: cache.valid,
            accepted_count: self.accepted.load(Ordering::Relaxed),
            rejected_count: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn try_accept(&self, message: &str, timestamp_ms: i64) -> Result<f64, Rejection> {
        if message.is_empty() {
            return Err(Rejection::EmptyMessage);
        }
        if self.is_debounced(&self.read_cache(), timestamp_ms) {
            return Err(Rejection::Debounced);
        }

        let separation = self.parse_separation(message)?;

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have committed since the check above.
        if self.is_debounced(&cache, timestamp_ms) {
            return Err(Rejection::Debounced);
        }
        cache.separation_meters = separation;
        cache.last_update_timestamp = timestamp_ms;
        cache.valid = true;

        Ok(separation)
    }

    fn is_debounced(&self, cache: &GeoidCache, timestamp_ms: i64) -> bool {
        timestamp_ms.saturating_sub(cache.last_update_timestamp) < self.config.debounce_ms
    }

    fn parse_separation(&self, message: &str) -> Result<f64, Rejection> {
        let fields = nmea::split_fields(message);

        if fields.len() < gga_field::MIN_FIELDS {
            return Err(Rejection::TooFewFields(fields.len()));
        }
        if !nmea::is_gga_talker(fields[gga_field::TALKER]) {
            return Err(Rejection::NotGga);
        }

        let hdop_field = fields[gga_field::HDOP];
        let geoid_field = fields[gga_field::GEOID];

        // No fix yet: $GPGGA,,,,,,0,,,,,,,,
        if hdop_field.is_empty() || geoid_field.is_empty() {
            return Err(Rejection::EmptyField);
        }

        let hdop: f64 = nmea::parse_number(hdop_field).ok_or(Rejection::InvalidPrecision)?;
        if hdop > self.config.max_hdop {
            return Err(Rejection::InsufficientPrecision);
        }

        nmea::parse_number(geoid_field).ok_or(Rejection::InvalidSeparation)
    }

    fn read_cache(&self) -> GeoidCache {
        *self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for GeoidSeparationExtractor {
    fn default() -> Self {
        Self::new()
    }
}
