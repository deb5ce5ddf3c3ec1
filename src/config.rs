//! Controller configuration.
//!
//! Read once at startup (JSON file or built-in defaults) and used to seed
//! the engine's [`TimingConfig`](crate::timing::TimingConfig).  Nothing is
//! written back; runtime changes live only in memory.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::app::ports::Resolution;
use crate::error::{Error, Result};
use crate::timing::IntensityBounds;

/// Which [`OutputSink`](crate::app::ports::OutputSink) the process drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputBackend {
    /// Log-only sink for development machines.
    #[default]
    Simulated,
    /// Relays or PWM channels on real pins.
    Hardware,
}

/// Core controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    // --- Output ---
    /// Relay (on/off) or PWM (dimmable) channels
    pub resolution: Resolution,
    /// Simulated or hardware-backed output
    pub output: OutputBackend,

    // --- Timing ---
    /// Behavior frame interval (milliseconds)
    pub tick_interval_ms: u32,
    /// Base phase length of the timed behaviors (seconds)
    pub minimum_on_time_secs: f32,
    /// Speed adjustment applied to the base phase (-100..=100 %)
    pub speed_adjustment_percent: i8,

    // --- Intensity ---
    /// Dim floor used by fades
    pub min_intensity: u8,
    /// Full brightness level
    pub max_intensity: u8,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::Pwm,
            output: OutputBackend::Simulated,

            tick_interval_ms: 50, // 20 Hz
            minimum_on_time_secs: 2.0,
            speed_adjustment_percent: 0,

            min_intensity: 0,
            max_intensity: 255,
        }
    }
}

impl LightConfig {
    /// Reject out-of-range values.  Nothing is silently clamped here; the
    /// live setters clamp, the file does not.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 || self.tick_interval_ms > 1000 {
            return Err(Error::Config("tick_interval_ms must be within 1..=1000"));
        }
        if !self.minimum_on_time_secs.is_finite() || self.minimum_on_time_secs < 0.0 {
            return Err(Error::Config("minimum_on_time_secs must be a non-negative number"));
        }
        if self.resolution == Resolution::Pwm && self.minimum_on_time_secs < 0.1 {
            return Err(Error::Config("minimum_on_time_secs must be at least 0.1 for PWM output"));
        }
        if !(-100..=100).contains(&self.speed_adjustment_percent) {
            return Err(Error::Config("speed_adjustment_percent must be within -100..=100"));
        }
        if IntensityBounds::new(self.min_intensity, self.max_intensity).is_err() {
            return Err(Error::Config("intensity bounds need 0 <= min <= max and max > 0"));
        }
        Ok(())
    }

    pub fn bounds(&self) -> IntensityBounds {
        IntensityBounds::new(self.min_intensity, self.max_intensity)
            .unwrap_or(IntensityBounds::FULL)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.tick_interval_ms))
    }

    /// Parse and validate a JSON document.  Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("config is not valid JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}
