// src/main.rs
//! Geoid Monitor - geoid separation from live or recorded NMEA streams

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use geoid_monitor::{
    config::GeoidConfig,
    display,
    geoid::{altitude, Egm96Grid, GeoidSeparationExtractor},
    monitor::{self, GeoidMonitor},
};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "geoid-monitor", version, about = "Track geoid separation from NMEA GGA sentences")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    monitor: MonitorArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch a sentence source (default)
    Monitor(MonitorArgs),
    /// Run a single sentence through the extractor
    Parse {
        sentence: String,
        #[arg(long, default_value_t = 10_000)]
        timestamp_ms: i64,
    },
    /// Look up the EGM96 separation at a position
    Lookup {
        #[arg(long)]
        egm96: PathBuf,
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
        /// Altitude above mean sea level in meters, prints the ellipsoidal height
        #[arg(long)]
        altitude: Option<f64>,
    },
    /// List available serial ports
    ListPorts,
}

#[derive(Args, Debug, Clone)]
struct MonitorArgs {
    /// Serial port with an NMEA receiver
    #[arg(long)]
    serial: Option<String>,
    #[arg(long, default_value_t = 9600)]
    baud: u32,
    /// gpsd host
    #[arg(long)]
    gpsd_host: Option<String>,
    #[arg(long)]
    gpsd_port: Option<u16>,
    /// Replay a recorded NMEA file
    #[arg(long)]
    replay: Option<PathBuf>,
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    /// Path to WW15MGH.DAC
    #[arg(long)]
    egm96: Option<PathBuf>,
    #[arg(long)]
    debounce_ms: Option<i64>,
    #[arg(long)]
    max_hdop: Option<f64>,
    /// Persist the effective settings
    #[arg(long)]
    save: bool,
}

impl MonitorArgs {
    fn apply(&self, config: &mut GeoidConfig) {
        if let Some(port) = &self.serial {
            config.update_serial(port.clone(), self.baud);
        }
        if self.gpsd_host.is_some() || self.gpsd_port.is_some() {
            let host = self
                .gpsd_host
                .clone()
                .or_else(|| config.gpsd_host.clone())
                .unwrap_or_else(|| "localhost".to_string());
            let port = self.gpsd_port.or(config.gpsd_port).unwrap_or(2947);
            config.update_gpsd(host, port);
        }
        if let Some(path) = &self.replay {
            config.update_replay(path.clone(), self.interval_ms);
        }
        if let Some(path) = &self.egm96 {
            config.egm96_path = Some(path.clone());
        }
        if let Some(debounce) = self.debounce_ms {
            config.debounce_ms = debounce;
        }
        if let Some(hdop) = self.max_hdop {
            config.max_hdop = hdop;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        None => run_monitor(cli.monitor).await,
        Some(Command::Monitor(args)) => run_monitor(args).await,
        Some(Command::Parse { sentence, timestamp_ms }) => {
            let extractor = GeoidSeparationExtractor::new();
            match extractor.evaluate(&sentence, timestamp_ms) {
                Ok(separation) => println!("accepted: geoid separation {:.1} m", separation),
                Err(reason) => println!("rejected: {}", reason),
            }
            Ok(())
        }
        Some(Command::Lookup { egm96, latitude, longitude, altitude: msl }) => {
            let grid = Egm96Grid::load(&egm96)?;
            let separation = grid
                .separation(latitude, longitude)
                .with_context(|| format!("no geoid value at {}, {}", latitude, longitude))?;
            println!("geoid separation: {:.2} m", separation);
            if let Some(msl) = msl {
                let ellipsoidal = altitude::ellipsoidal_from_msl(msl, separation);
                println!(
                    "ellipsoidal height: {:.1} m ({:.0} ft)",
                    ellipsoidal,
                    altitude::meters_to_feet(ellipsoidal)
                );
            }
            Ok(())
        }
        Some(Command::ListPorts) => {
            let ports = monitor::list_serial_ports()?;
            if ports.is_empty() {
                println!("No serial ports found.");
            } else {
                println!("Available serial ports:");
                for port in ports {
                    println!("  {} - {:?}", port.port_name, port.port_type);
                }
            }
            Ok(())
        }
    }
}

async fn run_monitor(args: MonitorArgs) -> anyhow::Result<()> {
    let mut config = GeoidConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "using default configuration");
        GeoidConfig::default()
    });
    args.apply(&mut config);
    config.validate()?;

    if args.save {
        config.save().context("saving configuration")?;
    }

    let grid = match &config.egm96_path {
        Some(path) => Some(Arc::new(Egm96Grid::load(path)?)),
        None => None,
    };

    let monitor = GeoidMonitor::with_config(config.extractor_config());
    let source = config.source()?;
    info!(source = %config.source_type, "starting geoid monitor");
    let handle = monitor.start(source).await?;

    if display::should_use_terminal() {
        monitor.run_display(grid).await?;
        monitor.stop();
    } else {
        tokio::select! {
            _ = handle => {}
            _ = tokio::signal::ctrl_c() => monitor.stop(),
        }
    }

    println!("{}", serde_json::to_string_pretty(&monitor.snapshot())?);
    Ok(())
}
