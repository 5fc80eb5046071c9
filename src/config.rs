// SPDX-License-Identifier: GPL-3.0-only

use crate::constants;
use crate::errors::ConfigError;
use crate::scanner::filter::DetectionLimits;
use crate::scanner::zoom::ZoomTuning;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Viewport the scanner preview is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        let (width, height) = constants::DEFAULT_VIEWPORT;
        Self { width, height }
    }
}

impl Viewport {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Scan session configuration
///
/// Missing fields fall back to the defaults in [`crate::constants`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Auto-zoom controller tuning
    pub zoom: ZoomTuning,
    /// Detection filter thresholds
    pub detection: DetectionLimits,
    /// Window in which an identical capture is suppressed
    pub dedup_window_ms: u64,
    /// How long activation waits for the device descriptor
    pub device_timeout_ms: u64,
    /// Initial viewport, until the host reports its real size
    pub viewport: Viewport,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomTuning::default(),
            detection: DetectionLimits::default(),
            dedup_window_ms: constants::DEDUP_WINDOW.as_millis() as u64,
            device_timeout_ms: constants::DEVICE_TIMEOUT.as_millis() as u64,
            viewport: Viewport::default(),
        }
    }
}

impl ScanConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device_timeout_ms)
    }

    /// Reject tuning the controller cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zoom = &self.zoom;
        let finite = [
            zoom.min_zoom,
            zoom.fallback_max_zoom,
            zoom.zoom_in_lower_ratio,
            zoom.zoom_in_upper_ratio,
            zoom.ideal_zoom_scale,
            zoom.zoom_in_step,
            zoom.zoom_out_ratio,
            zoom.zoom_out_step,
            zoom.idle_step,
            self.detection.min_box_side,
            self.viewport.width,
            self.viewport.height,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(invalid("all numeric values must be finite"));
        }

        if zoom.min_zoom <= 0.0 {
            return Err(invalid("zoom.min_zoom must be positive"));
        }
        if zoom.fallback_max_zoom < zoom.min_zoom {
            return Err(invalid("zoom.fallback_max_zoom must not be below zoom.min_zoom"));
        }
        if !(0.0 <= zoom.zoom_in_lower_ratio && zoom.zoom_in_lower_ratio < zoom.zoom_in_upper_ratio) {
            return Err(invalid(
                "zoom.zoom_in_lower_ratio must be non-negative and below zoom.zoom_in_upper_ratio",
            ));
        }
        // Zoom-out band sits strictly above the zoom-in band
        if zoom.zoom_out_ratio <= zoom.zoom_in_upper_ratio || zoom.zoom_out_ratio > 1.0 {
            return Err(invalid(
                "zoom.zoom_out_ratio must lie above zoom.zoom_in_upper_ratio and at most 1.0",
            ));
        }
        if zoom.zoom_in_step <= 0.0 || zoom.zoom_out_step <= 0.0 || zoom.idle_step <= 0.0 {
            return Err(invalid("zoom steps must be positive"));
        }
        if zoom.ideal_zoom_scale <= 0.0 {
            return Err(invalid("zoom.ideal_zoom_scale must be positive"));
        }
        if zoom.tick_interval_ms == 0 {
            return Err(invalid("zoom.tick_interval_ms must be positive"));
        }
        if self.detection.min_box_side < 0.0 {
            return Err(invalid("detection.min_box_side must not be negative"));
        }
        if self.viewport.width <= 0.0 || self.viewport.height <= 0.0 {
            return Err(invalid("viewport dimensions must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}
