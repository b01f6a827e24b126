// src/monitor.rs
//! Sentence sources feeding the geoid extractor

use crate::{
    display::terminal::TerminalDisplay,
    error::{GeoidError, Result},
    geoid::{Egm96Grid, ExtractorConfig, GeoidSample, GeoidSeparationExtractor},
    gps::{
        data::GgaFix,
        gpsd::{self, GpsdLine},
        nmea,
    },
    listener::{always_granted, ListenerRegistration, NmeaListener, PermissionCheck},
};
use chrono::Utc;
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, PoisonError, RwLock,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    task::JoinHandle,
};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Where NMEA sentences come from
#[derive(Debug, Clone, PartialEq)]
pub enum SentenceSource {
    Serial { port: String, baudrate: u32 },
    Gpsd { host: String, port: u16 },
    /// Recorded sentences, optionally prefixed with `<timestamp_ms>\t`
    Replay { path: PathBuf, interval_ms: u64 },
}

/// Most recent GGA fix seen on the stream, whatever the extractor made of it
#[derive(Debug, Clone, Default)]
pub struct TrackedFix {
    pub fix: Option<GgaFix>,
    pub raw: String,
    pub timestamp_ms: i64,
}

/// Listener keeping the latest GGA fix for display
#[derive(Debug, Default)]
pub struct FixTracker {
    latest: RwLock<TrackedFix>,
}

impl FixTracker {
    pub fn latest(&self) -> TrackedFix {
        self.latest.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl NmeaListener for FixTracker {
    fn on_nmea_message(&self, message: &str, timestamp_ms: i64) {
        if let Some(fix) = nmea::parse_gga(message) {
            let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
            latest.fix = Some(fix);
            latest.raw = message.to_string();
            latest.timestamp_ms = timestamp_ms;
        }
    }
}

/// Timestamps attached to incoming sentences
#[derive(Debug, Clone, Copy)]
enum Clock {
    Wall,
    Replay { next_ms: i64, interval_ms: i64 },
}

impl Clock {
    fn replay(interval_ms: u64) -> Self {
        Clock::Replay {
            next_ms: Utc::now().timestamp_millis(),
            interval_ms: i64::try_from(interval_ms).unwrap_or(i64::MAX),
        }
    }

    fn stamp<'a>(&mut self, line: &'a str) -> (i64, &'a str) {
        match self {
            Clock::Wall => (Utc::now().timestamp_millis(), line),
            Clock::Replay { next_ms, interval_ms } => {
                if let Some((prefix, sentence)) = line.split_once('\t') {
                    if let Ok(ts) = prefix.trim().parse::<i64>() {
                        return (ts, sentence.trim());
                    }
                }
                let ts = *next_ms;
                *next_ms = next_ms.saturating_add(*interval_ms);
                (ts, line)
            }
        }
    }
}

/// Reads lines from one source and hands them to the registration
struct LinePump {
    registration: Arc<ListenerRegistration>,
    permission: Arc<dyn PermissionCheck + Send + Sync>,
    running: Arc<AtomicBool>,
    clock: Clock,
    gpsd: bool,
    label: &'static str,
}

impl LinePump {
    async fn run<R: AsyncBufRead + Unpin>(mut self, mut reader: R) {
        let mut line = String::new();

        while self.running.load(Ordering::Relaxed) {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        self.handle(line);
                    }
                }
                Err(e) => {
                    warn!(source = self.label, error = %e, "read failed");
                    break;
                }
            }
        }
        debug!(source = self.label, "sentence source finished");
    }

    fn handle(&mut self, line: &str) {
        let sentence = if self.gpsd {
            match gpsd::classify_line(line) {
                Ok(GpsdLine::Sentence(sentence)) => sentence,
                Ok(GpsdLine::Version(release)) => {
                    info!(%release, "connected to gpsd");
                    return;
                }
                Ok(GpsdLine::Report(_)) => return,
                Err(e) => {
                    debug!(error = %e, "skipping gpsd line");
                    return;
                }
            }
        } else {
            line
        };

        let (timestamp_ms, sentence) = self.clock.stamp(sentence);

        if !self.registration.maybe_register(self.permission.as_ref()) {
            return;
        }
        self.registration.dispatch(sentence, timestamp_ms);
    }
}

/// Geoid monitor that wires sources, the extractor and the display together
pub struct GeoidMonitor {
    extractor: Arc<GeoidSeparationExtractor>,
    tracker: Arc<FixTracker>,
    registration: Arc<ListenerRegistration>,
    permission: Arc<dyn PermissionCheck + Send + Sync>,
    running: Arc<AtomicBool>,
}

impl GeoidMonitor {
    /// Create a monitor with the default extractor settings
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        let extractor = Arc::new(GeoidSeparationExtractor::with_config(config));
        let tracker = Arc::new(FixTracker::default());
        let registration = Arc::new(ListenerRegistration::new());
        registration.add_listener(extractor.clone());
        registration.add_listener(tracker.clone());

        Self {
            extractor,
            tracker,
            registration,
            permission: Arc::new(always_granted),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Gate delivery on a permission; sources retry registration per line
    pub fn with_permission(mut self, check: impl PermissionCheck + Send + Sync + 'static) -> Self {
        self.permission = Arc::new(check);
        self
    }

    pub fn extractor(&self) -> Arc<GeoidSeparationExtractor> {
        Arc::clone(&self.extractor)
    }

    pub fn registration(&self) -> Arc<ListenerRegistration> {
        Arc::clone(&self.registration)
    }

    /// Start reading from the given source in a background task
    pub async fn start(&self, source: SentenceSource) -> Result<JoinHandle<()>> {
        match source {
            SentenceSource::Serial { port, baudrate } => self.connect_serial(&port, baudrate),
            SentenceSource::Gpsd { host, port } => self.connect_gpsd(&host, port).await,
            SentenceSource::Replay { path, interval_ms } => self.open_replay(path, interval_ms).await,
        }
    }

    fn pump(&self, clock: Clock, gpsd: bool, label: &'static str) -> LinePump {
        LinePump {
            registration: Arc::clone(&self.registration),
            permission: Arc::clone(&self.permission),
            running: Arc::clone(&self.running),
            clock,
            gpsd,
            label,
        }
    }

    /// Connect to a GPS device via serial port
    fn connect_serial(&self, port: &str, baudrate: u32) -> Result<JoinHandle<()>> {
        info!(port, baudrate, "opening serial port");

        let serial = tokio_serial::new(port, baudrate)
            .timeout(Duration::from_millis(1000))
            .open_native_async()
            .map_err(|e| GeoidError::Connection(format!("Failed to open serial port {}: {}", port, e)))?;

        let pump = self.pump(Clock::Wall, false, "serial");
        Ok(tokio::spawn(pump.run(BufReader::new(serial))))
    }

    /// Connect to gpsd daemon
    async fn connect_gpsd(&self, host: &str, port: u16) -> Result<JoinHandle<()>> {
        info!(host, port, "connecting to gpsd");

        let reader = gpsd::connect_gpsd(host, port).await?;
        let pump = self.pump(Clock::Wall, true, "gpsd");
        Ok(tokio::spawn(pump.run(reader)))
    }

    /// Replay a recorded sentence file
    async fn open_replay(&self, path: PathBuf, interval_ms: u64) -> Result<JoinHandle<()>> {
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| GeoidError::Connection(format!("Failed to open {}: {}", path.display(), e)))?;

        info!(path = %path.display(), interval_ms, "replaying sentences");
        let pump = self.pump(Clock::replay(interval_ms), false, "replay");
        Ok(tokio::spawn(pump.run(BufReader::new(file))))
    }

    /// Run the terminal status display until stopped
    pub async fn run_display(&self, grid: Option<Arc<Egm96Grid>>) -> Result<()> {
        let display = TerminalDisplay::new(grid);
        display
            .run(
                Arc::clone(&self.extractor),
                Arc::clone(&self.tracker),
                Arc::clone(&self.running),
            )
            .await
    }

    /// Stop the monitor
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Check if the monitor is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn current_separation(&self) -> f64 {
        self.extractor.current_separation()
    }

    pub fn snapshot(&self) -> GeoidSample {
        self.extractor.snapshot()
    }

    pub fn last_fix(&self) -> TrackedFix {
        self.tracker.latest()
    }
}

impl Default for GeoidMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// List available serial ports
pub fn list_serial_ports() -> Result<Vec<tokio_serial::SerialPortInfo>> {
    tokio_serial::available_ports()
        .map_err(|e| GeoidError::Other(format!("Failed to list serial ports: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "$GPGGA,212716.00,4850.676296,N,01005.195966,E,1,09,1.0,446.2,M,47.9,M,,*76";

    fn pump_for(monitor: &GeoidMonitor, clock: Clock, gpsd: bool) -> LinePump {
        monitor.pump(clock, gpsd, "test")
    }

    #[test]
    fn test_replay_clock_prefix() {
        let mut clock = Clock::Replay { next_ms: 0, interval_ms: 500 };
        assert_eq!(clock.stamp("12345\t$GPGGA,x"), (12345, "$GPGGA,x"));
        assert_eq!(clock.stamp("$GPGGA,y"), (0, "$GPGGA,y"));
        assert_eq!(clock.stamp("$GPGGA,z"), (500, "$GPGGA,z"));
        // non numeric prefix is treated as part of the sentence
        assert_eq!(clock.stamp("abc\t$GPGGA"), (1000, "abc\t$GPGGA"));
    }

    #[tokio::test]
    async fn test_pump_dispatches_sentences() {
        let monitor = GeoidMonitor::new();
        let input = format!("10000\t{}\n\n15000\t$GPGGA,,,,,,0,,,,,,,,\n", VALID);
        pump_for(&monitor, Clock::Replay { next_ms: 0, interval_ms: 1 }, false)
            .run(input.as_bytes())
            .await;

        assert_eq!(monitor.current_separation(), 47.9);
        let tracked = monitor.last_fix();
        assert_eq!(tracked.fix.unwrap().fix_quality, Some(0));
    }

    #[tokio::test]
    async fn test_gpsd_pump_skips_json() {
        let monitor = GeoidMonitor::new();
        let input = format!(
            "{{\"class\":\"VERSION\",\"release\":\"3.25\"}}\n{{broken\n{}\n",
            VALID
        );
        pump_for(&monitor, Clock::Replay { next_ms: 10_000, interval_ms: 1 }, true)
            .run(input.as_bytes())
            .await;

        let sample = monitor.snapshot();
        assert_eq!(sample.separation_meters, 47.9);
        assert_eq!(sample.accepted_count, 1);
        assert_eq!(sample.rejected_count, 0);
    }

    #[tokio::test]
    async fn test_permission_denied_drops_sentences() {
        let monitor = GeoidMonitor::new().with_permission(|| false);
        let input = format!("20000\t{}\n", VALID);
        pump_for(&monitor, Clock::Replay { next_ms: 0, interval_ms: 1 }, false)
            .run(input.as_bytes())
            .await;

        assert!(!monitor.registration().is_registered());
        assert!(!monitor.extractor().is_valid());
    }

    #[tokio::test]
    async fn test_stopped_pump_reads_nothing() {
        let monitor = GeoidMonitor::new();
        monitor.stop();
        let input = format!("20000\t{}\n", VALID);
        pump_for(&monitor, Clock::Replay { next_ms: 0, interval_ms: 1 }, false)
            .run(input.as_bytes())
            .await;
        assert!(!monitor.is_running());
        assert_eq!(monitor.snapshot().accepted_count, 0);
    }

    #[tokio::test]
    async fn test_replay_missing_file() {
        let monitor = GeoidMonitor::new();
        let result = monitor
            .start(SentenceSource::Replay {
                path: PathBuf::from("/nonexistent/flight.nmea"),
                interval_ms: 1000,
            })
            .await;
        assert!(matches!(result, Err(GeoidError::Connection(_))));
    }
}
