// SPDX-License-Identifier: GPL-3.0-only

//! Scan loop tuning constants
//!
//! These are the canonical defaults for the auto-zoom controller, the
//! detection filter and the capture coordinator. Every value can be
//! overridden through [`crate::config::ScanConfig`].

use std::time::Duration;

/// Neutral zoom factor (no magnification)
pub const MIN_ZOOM: f64 = 1.0;

/// Max zoom used until the camera reports its real capability
pub const FALLBACK_MAX_ZOOM: f64 = 4.0;

// ===== Zoom-in band =====

/// Below this bounding-box ratio a detection is treated as noise
pub const ZOOM_IN_LOWER_RATIO: f64 = 0.0005;

/// Codes smaller than this share of the frame are zoomed towards
pub const ZOOM_IN_UPPER_RATIO: f64 = 0.03;

/// Multiplier turning the ratio deficit into an ideal zoom factor
pub const IDEAL_ZOOM_SCALE: f64 = 50.0;

/// Maximum target increase per adjustment
pub const ZOOM_IN_STEP: f64 = 0.15;

// ===== Zoom-out band =====

/// Codes larger than this share of the frame are zoomed away from
pub const ZOOM_OUT_RATIO: f64 = 0.10;

/// Target decrease per adjustment
pub const ZOOM_OUT_STEP: f64 = 0.2;

// ===== Timing =====

/// Minimum time between two zoom adjustments
pub const ZOOM_COOLDOWN: Duration = Duration::from_millis(400);

/// Duration of the eased transition towards a new target
pub const ZOOM_ANIMATION: Duration = Duration::from_millis(400);

/// Idle-reset timer cadence
pub const IDLE_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Time without detections before zoom starts retracting
pub const IDLE_THRESHOLD: Duration = Duration::from_millis(500);

/// Target decrease per idle tick
pub const IDLE_STEP: f64 = 0.2;

// ===== Detection / capture =====

/// Minimum bounding box side (in frame units) for a detection to count
pub const MIN_BOX_SIDE: f64 = 20.0;

/// Window in which an identical value is not emitted twice
pub const DEDUP_WINDOW: Duration = Duration::from_millis(2000);

/// How long activation waits for the camera device descriptor
pub const DEVICE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Default viewport used for ratio computation until the host reports one
pub const DEFAULT_VIEWPORT: (f64, f64) = (1080.0, 1920.0);
