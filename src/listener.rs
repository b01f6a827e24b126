// src/listener.rs
//! NMEA listener registration
//!
//! Sentence sources only deliver once the listener is registered, and
//! registration needs the fine location permission. Registration may be
//! attempted any number of times until the permission shows up.

use crate::geoid::GeoidSeparationExtractor;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, PoisonError, RwLock,
};
use tracing::{debug, info};

/// Receiver of raw NMEA sentences
pub trait NmeaListener: Send + Sync {
    fn on_nmea_message(&self, message: &str, timestamp_ms: i64);
}

impl NmeaListener for GeoidSeparationExtractor {
    fn on_nmea_message(&self, message: &str, timestamp_ms: i64) {
        self.on_sentence(message, timestamp_ms);
    }
}

/// Source of the fine location permission state
pub trait PermissionCheck {
    fn fine_location_granted(&self) -> bool;
}

impl<F: Fn() -> bool> PermissionCheck for F {
    fn fine_location_granted(&self) -> bool {
        self()
    }
}

/// Permission check for hosts without a permission model
pub fn always_granted() -> bool {
    true
}

/// Registration guard that fans sentences out to its listeners
#[derive(Default)]
pub struct ListenerRegistration {
    listeners: RwLock<Vec<Arc<dyn NmeaListener>>>,
    registered: AtomicBool,
}

impl ListenerRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn NmeaListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Try to register. Returns true once registered.
    pub fn maybe_register(&self, check: &dyn PermissionCheck) -> bool {
        if self.registered.load(Ordering::Acquire) {
            return true;
        }

        if !check.fine_location_granted() {
            debug!("fine location permission not granted");
            return false;
        }

        if !self.registered.swap(true, Ordering::AcqRel) {
            info!("NMEA listener registered");
        }
        true
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Forward a sentence to all listeners. Dropped while unregistered.
    pub fn dispatch(&self, message: &str, timestamp_ms: i64) {
        if !self.is_registered() {
            return;
        }
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener.on_nmea_message(message, timestamp_ms);
        }
    }
}

impl std::fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("listeners", &self.listeners.read().map(|l| l.len()).unwrap_or(0))
            .field("registered", &self.is_registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const VALID: &str = "$GPGGA,212716.00,4850.676296,N,01005.195966,E,1,09,1.0,446.2,M,47.9,M,,*76";

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl NmeaListener for Counting {
        fn on_nmea_message(&self, _message: &str, _timestamp_ms: i64) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_retry_until_granted() {
        let registration = ListenerRegistration::new();
        let granted = AtomicBool::new(false);
        let check = || granted.load(Ordering::Relaxed);

        assert!(!registration.maybe_register(&check));
        assert!(!registration.maybe_register(&check));
        assert!(!registration.is_registered());

        granted.store(true, Ordering::Relaxed);
        assert!(registration.maybe_register(&check));
        assert!(registration.is_registered());

        // Once registered a revoked permission does not unregister
        granted.store(false, Ordering::Relaxed);
        assert!(registration.maybe_register(&check));
    }

    #[test]
    fn test_dispatch_only_when_registered() {
        let registration = ListenerRegistration::new();
        let counter = Arc::new(Counting::default());
        registration.add_listener(counter.clone());

        registration.dispatch("$GPGGA", 0);
        assert_eq!(counter.0.load(Ordering::Relaxed), 0);

        registration.maybe_register(&always_granted);
        registration.dispatch("$GPGGA", 0);
        registration.dispatch("$GPGGA", 1);
        assert_eq!(counter.0.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_extractor_as_listener() {
        let registration = ListenerRegistration::new();
        let extractor = Arc::new(GeoidSeparationExtractor::new());
        registration.add_listener(extractor.clone());
        registration.maybe_register(&always_granted);

        registration.dispatch(VALID, 10_000);
        assert_eq!(extractor.current_separation(), 47.9);
    }
}
