use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tpms_core::{Classifier, FieldLayout, SensorId, SensorRegistry};

use crate::transport::serial::DEFAULT_BAUD_RATE;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Location labels layered over the calibrated defaults
    #[serde(default)]
    pub sensors: Vec<SensorLabel>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    Serial {
        /// Device path, e.g. `/dev/ttyUSB0` or `COM3`
        port: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
    Simulated {
        /// Milliseconds between simulated frames
        interval_ms: u64,
        /// Fixed seed for a reproducible stream
        seed: Option<u64>,
    },
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Simulated {
            interval_ms: 500,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub layout: FieldLayout,
    /// Milliseconds to sleep when the transport has nothing to read
    pub poll_interval_ms: u64,
    pub channel_capacity: usize,
}

impl DecoderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            layout: FieldLayout::WIRE,
            poll_interval_ms: 10,
            channel_capacity: 100,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CaptureConfig {
    /// Append every received chunk to this file
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct SensorLabel {
    pub id: SensorId,
    pub label: String,
}

impl Config {
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Calibrated locations with the configured labels applied on top.
    pub fn sensor_registry(&self) -> SensorRegistry {
        SensorRegistry::calibrated().extend_from(
            self.sensors
                .iter()
                .map(|s| (s.id, s.label.as_str().into())),
        )
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.decoder.layout, Arc::new(self.sensor_registry()))
    }
}
