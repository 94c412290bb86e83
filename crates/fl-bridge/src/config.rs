use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fl_core::{CaptureConfig, OutputPixelFormat, PlayerConfig, TransportConfig};
use serde::{Deserialize, Serialize};

use crate::pattern::Pattern;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub run: RunConfig,
    pub capture: CaptureConfig,
    pub player: PlayerConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// How often the player polls.
    pub tick_interval_ms: u64,
    pub stats_interval_secs: u64,
    pub pattern: Pattern,
    /// Size of the generated frames in pixels.
    pub width: u32,
    pub height: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            stats_interval_secs: 5,
            pattern: Pattern::Bars,
            width: 1280,
            height: 720,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.capture.validate().context("Invalid [capture] section")?;
        self.player.validate().context("Invalid [player] section")?;
        self.transport.validate().context("Invalid [transport] section")?;

        if self.run.width == 0 || self.run.height == 0 {
            anyhow::bail!("Invalid frame size {}x{}", self.run.width, self.run.height);
        }

        if self.capture.output_pixel_format == OutputPixelFormat::P210 && self.run.width % 6 != 0 {
            anyhow::bail!("P210 frame width must be a multiple of 6, got {}", self.run.width);
        }

        if self.run.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms must be at least 1");
        }

        if self.run.stats_interval_secs == 0 {
            anyhow::bail!("stats_interval_secs must be at least 1");
        }

        Ok(())
    }
}
