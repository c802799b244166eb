//! Replay tool configuration

use anyhow::Context;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::{Deserialize, Serialize};
use touch_tracker::TrackerConfig;

/// Prefix for environment overrides, e.g. `TOUCH__TRACKER__FILTER__MOVEMENT_FILTERING=2`
const ENV_PREFIX: &str = "TOUCH";

/// Replay tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Publish raw events as if a calibration session were active
    pub calibrating: bool,
    /// Print raw events alongside calibrated ones
    pub raw_events: bool,
    /// Print the Prometheus export after the replay
    pub metrics: bool,
    /// Capacity of the broadcast channel feeding the printer
    pub channel_capacity: usize,
    /// Engine configuration
    pub tracker: TrackerConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            calibrating: false,
            raw_events: false,
            metrics: false,
            channel_capacity: 4096,
            tracker: TrackerConfig::default(),
        }
    }
}

impl ReplayConfig {
    /// Load from an optional config file (any format the `config` crate
    /// recognizes by extension) and `TOUCH__*` environment variables.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = Config::builder().add_source(File::with_name(path).required(false));
        Self::build(builder)
    }

    /// Load from an in-memory TOML document plus environment overrides
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let builder = Config::builder().add_source(File::from_str(contents, FileFormat::Toml));
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read replay configuration")?;

        let config: Self = settings
            .try_deserialize()
            .context("Invalid replay configuration")?;

        if config.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be positive");
        }
        config.tracker.validate()?;

        Ok(config)
    }
}

// ============================================================================
// TESTS
// ============================================================================
