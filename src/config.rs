// src/config.rs
//! Configuration management

use crate::{
    error::{GeoidError, Result},
    geoid::{extractor, ExtractorConfig},
    monitor::SentenceSource,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoidConfig {
    pub source_type: String, // "serial", "gpsd", "replay"
    pub serial_port: Option<String>,
    pub serial_baudrate: Option<u32>,
    pub gpsd_host: Option<String>,
    pub gpsd_port: Option<u16>,
    pub replay_path: Option<PathBuf>,
    pub replay_interval_ms: Option<u64>,
    pub debounce_ms: i64,
    pub max_hdop: f64,
    pub egm96_path: Option<PathBuf>,
}

impl Default for GeoidConfig {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl GeoidConfig {
    /// Default configuration: read from a local gpsd
    pub fn platform_default() -> Self {
        Self {
            source_type: "gpsd".to_string(),
            serial_port: None,
            serial_baudrate: Some(9600),
            gpsd_host: Some("localhost".to_string()),
            gpsd_port: Some(2947),
            replay_path: None,
            replay_interval_ms: Some(1000),
            debounce_ms: extractor::DEBOUNCE_MS,
            max_hdop: extractor::MAX_HDOP,
            egm96_path: None,
        }
    }

    /// Load configuration from the user config file
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Save configuration to the user config file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::platform_default());
        }

        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| GeoidError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| GeoidError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GeoidError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)?;

        std::fs::write(config_path, contents)
            .map_err(|e| GeoidError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| GeoidError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("geoid-monitor").join("config.json"))
    }

    /// Reject tuning values the extractor cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms < 0 {
            return Err(GeoidError::Config(format!(
                "debounce_ms must not be negative, got {}",
                self.debounce_ms
            )));
        }
        if !self.max_hdop.is_finite() || self.max_hdop <= 0.0 {
            return Err(GeoidError::Config(format!(
                "max_hdop must be a positive number, got {}",
                self.max_hdop
            )));
        }
        Ok(())
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            debounce_ms: self.debounce_ms,
            max_hdop: self.max_hdop,
        }
    }

    /// Resolve the configured sentence source
    pub fn source(&self) -> Result<SentenceSource> {
        match self.source_type.as_str() {
            "serial" => {
                let port = self
                    .serial_port
                    .clone()
                    .ok_or_else(|| GeoidError::Config("serial source needs a serial_port".to_string()))?;
                Ok(SentenceSource::Serial {
                    port,
                    baudrate: self.serial_baudrate.unwrap_or(9600),
                })
            }
            "gpsd" => Ok(SentenceSource::Gpsd {
                host: self.gpsd_host.clone().unwrap_or_else(|| "localhost".to_string()),
                port: self.gpsd_port.unwrap_or(2947),
            }),
            "replay" => {
                let path = self
                    .replay_path
                    .clone()
                    .ok_or_else(|| GeoidError::Config("replay source needs a replay_path".to_string()))?;
                Ok(SentenceSource::Replay {
                    path,
                    interval_ms: self.replay_interval_ms.unwrap_or(1000),
                })
            }
            other => Err(GeoidError::Config(format!("Unknown source type: {}", other))),
        }
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.source_type = "serial".to_string();
        self.serial_port = Some(port);
        self.serial_baudrate = Some(baudrate);
    }

    /// Update gpsd settings
    pub fn update_gpsd(&mut self, host: String, port: u16) {
        self.source_type = "gpsd".to_string();
        self.gpsd_host = Some(host);
        self.gpsd_port = Some(port);
    }

    /// Update replay settings
    pub fn update_replay(&mut self, path: PathBuf, interval_ms: u64) {
        self.source_type = "replay".to_string();
        self.replay_path = Some(path);
        self.replay_interval_ms = Some(interval_ms);
    }
}
