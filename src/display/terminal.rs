// src/display/terminal.rs
//! Terminal-based status display

use crate::{
    error::{GeoidError, Result},
    geoid::{altitude, Egm96Grid, GeoidSample, GeoidSeparationExtractor},
    gps::data::GgaFix,
    monitor::{FixTracker, TrackedFix},
};
use chrono::{TimeZone, Utc};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::sleep;

pub struct TerminalDisplay {
    grid: Option<Arc<Egm96Grid>>,
}

impl TerminalDisplay {
    pub fn new(grid: Option<Arc<Egm96Grid>>) -> Self {
        Self { grid }
    }

    /// Start the terminal display loop
    pub async fn run(
        &self,
        extractor: Arc<GeoidSeparationExtractor>,
        tracker: Arc<FixTracker>,
        running: Arc<AtomicBool>,
    ) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, Hide, DisableLineWrap)?;

        let running_clone = Arc::clone(&running);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                running_clone.store(false, Ordering::Relaxed);
            }
        });

        while running.load(Ordering::Relaxed) {
            execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;

            let sample = extractor.snapshot();
            let tracked = tracker.latest();
            self.render(&mut stdout, &sample, &tracked, Utc::now().timestamp_millis())?;

            stdout.flush()?;
            sleep(Duration::from_secs(1)).await;
        }

        execute!(stdout, Show, EnableLineWrap)?;
        Ok(())
    }

    /// Render the current state
    pub fn render(
        &self,
        out: &mut impl Write,
        sample: &GeoidSample,
        tracked: &TrackedFix,
        now_ms: i64,
    ) -> Result<()> {
        execute!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\nGeoid Monitor\n"),
            Print("=".repeat(60)),
            Print("\n"),
            ResetColor
        )?;

        self.render_geoid_section(out, sample, now_ms)?;
        if let Some(fix) = &tracked.fix {
            self.render_fix_section(out, fix)?;
            self.render_altitude_section(out, fix, sample)?;
        }
        self.render_raw_section(out, tracked)?;

        execute!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\nPress Ctrl+C to exit\n"),
            ResetColor
        )?;
        Ok(())
    }

    fn render_geoid_section(&self, out: &mut impl Write, sample: &GeoidSample, now_ms: i64) -> Result<()> {
        heading(out, Color::Yellow, "GEOID:")?;

        let separation = if sample.valid {
            format!("{:>12.1} m", sample.separation_meters)
        } else {
            "No valid GGA fix yet".to_string()
        };
        let updated = match Utc.timestamp_millis_opt(sample.last_update_timestamp).single() {
            Some(ts) if sample.valid => format!(
                "{} ({} s ago)",
                ts.format("%Y-%m-%d %H:%M:%S UTC"),
                now_ms.saturating_sub(sample.last_update_timestamp) / 1000
            ),
            _ => "Never".to_string(),
        };

        line(out, format!("  Separation:  {}\n", separation))?;
        line(out, format!("  Updated:     {}\n", updated))?;
        line(
            out,
            format!(
                "  Sentences:   {} accepted, {} rejected\n\n",
                sample.accepted_count, sample.rejected_count
            ),
        )
    }

    fn render_fix_section(&self, out: &mut impl Write, fix: &GgaFix) -> Result<()> {
        heading(out, Color::Cyan, "FIX:")?;

        line(out, format!("  Latitude:  {}\n", GgaFix::format_coordinate(fix.latitude)))?;
        line(out, format!("  Longitude: {}\n", GgaFix::format_coordinate(fix.longitude)))?;
        line(out, format!("  Satellites:{}\n", GgaFix::format_value(fix.satellites, "")))?;
        line(out, format!("  HDOP:      {}\n", GgaFix::format_value(fix.hdop, "")))?;
        line(out, format!("  Fix Type:  {:>12}\n\n", fix.fix_description()))
    }

    fn render_altitude_section(&self, out: &mut impl Write, fix: &GgaFix, sample: &GeoidSample) -> Result<()> {
        heading(out, Color::Magenta, "ALTITUDE:")?;

        line(out, format!("  MSL:       {}\n", GgaFix::format_value(fix.altitude, "m")))?;
        if let (Some(alt), true) = (fix.altitude, sample.valid) {
            let ellipsoidal = altitude::ellipsoidal_from_msl(alt, sample.separation_meters);
            line(out, format!("  Ellipsoid: {:>12.1} m\n", ellipsoidal))?;
            line(
                out,
                format!(
                    "  True alt:  {:>12} ft\n",
                    altitude::true_altitude_feet(ellipsoidal, sample.separation_meters)
                ),
            )?;
        }

        let model = match (&self.grid, fix.latitude, fix.longitude) {
            (Some(grid), Some(lat), Some(lon)) => grid.separation(lat, lon),
            _ => None,
        };
        if let Some(model) = model {
            line(out, format!("  EGM96:     {:>12.1} m\n", model))?;
        }
        line(out, "\n".to_string())
    }

    fn render_raw_section(&self, out: &mut impl Write, tracked: &TrackedFix) -> Result<()> {
        heading(out, Color::Blue, "RAW DATA:")?;

        let raw = if tracked.raw.is_empty() { "No data" } else { tracked.raw.as_str() };
        line(out, format!("  {}\n\n", raw))
    }
}

fn heading(out: &mut impl Write, color: Color, title: &str) -> Result<()> {
    execute!(out, SetForegroundColor(color), Print(title), Print("\n"), ResetColor).map_err(GeoidError::Io)
}

fn line(out: &mut impl Write, text: String) -> Result<()> {
    execute!(out, Print(text)).map_err(GeoidError::Io)
}
