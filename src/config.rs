// Capture and magnifier settings.
//
// `CaptureConfig` can change at any time while a session runs; the capture
// loop reads it again on every tick. Settings files are TOML, every key is
// optional and named presets can stand in for raw numbers.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Pixels sampled around the scan point when nothing else is configured.
pub const DEFAULT_CROP_SIZE: u32 = 12;

/// Target reticle diameter in density-independent units.
pub const TARGET_DIAMETER_DP: f64 = 40.0;

/// How often the loop samples the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSpeed {
    Fast,
    Normal,
    Slow,
}

impl CaptureSpeed {
    pub fn delay_ms(self) -> u64 {
        match self {
            CaptureSpeed::Fast => 25,
            CaptureSpeed::Normal => 50,
            CaptureSpeed::Slow => 100,
        }
    }
}

/// Magnifier bubble size presets, in density-independent units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MagnifierSize {
    Small,
    Medium,
    Large,
}

impl MagnifierSize {
    pub fn diameter_dp(self) -> f64 {
        match self {
            MagnifierSize::Small => 150.0,
            MagnifierSize::Medium => 200.0,
            MagnifierSize::Large => 250.0,
        }
    }

    pub fn diameter_px(self, density: f64) -> u32 {
        (self.diameter_dp() * density).round() as u32
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub capture_delay_ms: u64,
    pub magnifier_diameter_px: u32,
    pub crop_size: u32,
    pub show_grid_lines: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capture_delay_ms: CaptureSpeed::Normal.delay_ms(),
            magnifier_diameter_px: MagnifierSize::Small.diameter_px(2.0),
            crop_size: DEFAULT_CROP_SIZE,
            show_grid_lines: true,
        }
    }
}

/// On-disk shape: presets and raw values side by side, raw values win.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    capture_speed: Option<CaptureSpeed>,
    capture_delay_ms: Option<u64>,
    magnifier_size: Option<MagnifierSize>,
    magnifier_diameter_px: Option<u32>,
    density: Option<f64>,
    crop_size: Option<u32>,
    show_grid_lines: Option<bool>,
}

impl CaptureConfig {
    pub fn capture_delay(&self) -> Duration {
        Duration::from_millis(self.capture_delay_ms)
    }

    pub fn magnifier_radius(&self) -> f64 {
        self.magnifier_diameter_px as f64 / 2.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crop_size == 0 {
            return Err(ConfigError::InvalidCropSize);
        }
        if self.capture_delay_ms == 0 {
            return Err(ConfigError::InvalidDelay);
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let defaults = CaptureConfig::default();
        let density = file.density.unwrap_or(1.0);

        let config = CaptureConfig {
            capture_delay_ms: file
                .capture_delay_ms
                .or(file.capture_speed.map(CaptureSpeed::delay_ms))
                .unwrap_or(defaults.capture_delay_ms),
            magnifier_diameter_px: file
                .magnifier_diameter_px
                .or(file.magnifier_size.map(|s| s.diameter_px(density)))
                .unwrap_or(defaults.magnifier_diameter_px),
            crop_size: file.crop_size.unwrap_or(defaults.crop_size),
            show_grid_lines: file.show_grid_lines.unwrap_or(defaults.show_grid_lines),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
