//! Configuration options for instapick.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Options {
    /// Pick buffer refresh settings.
    pub picker: PickerOptions,

    /// Visible scene shading.
    pub shading: ShadingOptions,
}

impl Options {
    /// Parses options from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the options as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Pick buffer refresh settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerOptions {
    /// Refresh the pick buffer every this many displayed frames (0 is
    /// treated as 1).
    pub refresh_interval: u32,

    /// Whether picking runs at all.
    pub enabled: bool,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            refresh_interval: 4,
            enabled: true,
        }
    }
}

/// Lighting and clear color of the visible scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingOptions {
    /// Clear color.
    pub background_color: Vec3,

    /// Direction the light travels, in world space.
    pub light_direction: Vec3,

    /// Ambient light intensity.
    pub ambient: f32,
}

impl Default for ShadingOptions {
    fn default() -> Self {
        Self {
            background_color: Vec3::new(0.1, 0.1, 0.12),
            light_direction: Vec3::new(-0.5, -1.0, -0.3),
            ambient: 0.25,
        }
    }
}

/// Decides on which frames the pick buffer is refreshed.
///
/// The first frame always fires so a buffer exists as early as possible.
#[derive(Debug, Clone, Copy)]
pub struct FrameThrottle {
    interval: u32,
    frame: u64,
}

impl FrameThrottle {
    /// Creates a throttle firing every `interval` frames.
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            frame: 0,
        }
    }

    /// Advances one frame and returns whether this frame should refresh.
    pub fn tick(&mut self) -> bool {
        let fire = self.frame % u64::from(self.interval) == 0;
        self.frame += 1;
        fire
    }

    /// Frames counted so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl From<&PickerOptions> for FrameThrottle {
    fn from(options: &PickerOptions) -> Self {
        Self::new(options.refresh_interval)
    }
}
