//! Tunables for the camera and the point layout.
//!
//! Everything here is fixed once a [`crate::Viewer`] is constructed. Hosts
//! usually start from `ViewerConfig::default()` or deserialize a partial JSON
//! document; missing fields fall back to the defaults below.

use crate::data::Rgb;
use crate::error::{Error, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub layout: LayoutConfig,
}

impl ViewerConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.camera.validate()?;
        self.layout.validate()
    }
}

/// Orbit camera tunables. Angles are in degrees, distances in scene units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    // --- Initial pose (restored by `reset`) ---
    pub initial_pivot: Vec3,
    pub initial_distance: f32,
    pub initial_yaw: f32,
    pub initial_pitch: f32,

    // --- Distance ---
    pub min_distance: f32,
    pub max_distance: f32,
    /// Base scroll step; scaled by the distance tiers when `adaptive_zoom` is on.
    pub zoom_speed: f32,
    pub adaptive_zoom: bool,

    // --- Rotation / pan ---
    /// Degrees of yaw/pitch per unit of drag.
    pub rotation_speed: f32,
    pub pan_speed: f32,
    pub min_pitch: f32,
    pub max_pitch: f32,

    // --- Smoothing ---
    /// Approximate time (seconds) for the damped spring to reach its target.
    pub smooth_time: f32,
    pub smoothing: bool,

    // --- Framing ---
    /// Multiple of the box diagonal used as orbit distance by `focus_on_bounds`.
    pub framing_multiplier: f32,
    pub focus_yaw: f32,
    pub focus_pitch: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            initial_pivot: Vec3::ZERO,
            initial_distance: 100.0,
            initial_yaw: 0.0,
            initial_pitch: 0.0,
            min_distance: 1.0,
            max_distance: 50_000.0,
            zoom_speed: 1000.0,
            adaptive_zoom: true,
            rotation_speed: 2.0,
            pan_speed: 1.0,
            min_pitch: -80.0,
            max_pitch: 80.0,
            smooth_time: 0.1,
            smoothing: true,
            framing_multiplier: 3.0,
            focus_yaw: 45.0,
            focus_pitch: 25.0,
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.initial_distance,
            self.initial_yaw,
            self.initial_pitch,
            self.min_distance,
            self.max_distance,
            self.zoom_speed,
            self.rotation_speed,
            self.pan_speed,
            self.min_pitch,
            self.max_pitch,
            self.smooth_time,
            self.framing_multiplier,
            self.focus_yaw,
            self.focus_pitch,
        ];
        if !self.initial_pivot.is_finite() || finite.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidConfig("camera values must be finite".into()));
        }
        if self.min_distance <= 0.0 || self.min_distance > self.max_distance {
            return Err(Error::InvalidConfig(format!(
                "distance bounds [{}, {}] are not a positive range",
                self.min_distance, self.max_distance
            )));
        }
        if self.min_pitch > self.max_pitch || self.min_pitch < -90.0 || self.max_pitch > 90.0 {
            return Err(Error::InvalidConfig(format!(
                "pitch bounds [{}, {}] must be ordered and within [-90, 90]",
                self.min_pitch, self.max_pitch
            )));
        }
        if self.smooth_time < 0.0 || self.zoom_speed < 0.0 || self.framing_multiplier <= 0.0 {
            return Err(Error::InvalidConfig(
                "smooth_time and zoom_speed must be >= 0, framing_multiplier > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Point layout tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Records per tick for budgets up to `large_batch_threshold`.
    pub small_batch_size: usize,
    /// Records per tick for budgets above `large_batch_threshold`.
    pub large_batch_size: usize,
    pub large_batch_threshold: usize,
    /// Emit a `DrawBounds` command on load.
    pub show_bounds: bool,
    /// Colour for points whose payload carried no colour.
    pub default_color: Rgb,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            small_batch_size: 50,
            large_batch_size: 100,
            large_batch_threshold: 5000,
            show_bounds: true,
            default_color: [1.0, 1.0, 1.0],
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        if self.small_batch_size == 0 || self.large_batch_size == 0 {
            return Err(Error::InvalidConfig("batch sizes must be at least 1".into()));
        }
        Ok(())
    }

    /// Batch size for a job that will emit up to `max_display_points` records.
    pub fn batch_size_for(&self, max_display_points: usize) -> usize {
        if max_display_points > self.large_batch_threshold {
            self.large_batch_size
        } else {
            self.small_batch_size
        }
    }
}
