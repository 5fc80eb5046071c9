// SPDX-License-Identifier: GPL-3.0-only

//! Auto-zoom controller
//!
//! Keeps a detected code at a comfortable apparent size. The size proxy is
//! the bounding-box ratio (code area / screen area):
//!
//! ```text
//!   ratio:  0 ── lower ──────── upper ─────────── zoom_out ───── 1
//!              noise │ zoom in  │   hold (hysteresis)  │ zoom out
//! ```
//!
//! Rule adjustments are rate limited by a cooldown and move the target in
//! bounded steps; the displayed zoom follows with an eased transition that
//! the render layer samples via [`ZoomController::current_zoom`]. A
//! periodic [`ZoomController::tick`] retracts zoom to neutral once
//! detections stop arriving.

use super::types::DetectionEvent;
use crate::constants;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Controller tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomTuning {
    pub min_zoom: f64,
    /// Used as max zoom until the device descriptor resolves
    pub fallback_max_zoom: f64,
    pub zoom_in_lower_ratio: f64,
    pub zoom_in_upper_ratio: f64,
    pub ideal_zoom_scale: f64,
    pub zoom_in_step: f64,
    pub zoom_out_ratio: f64,
    pub zoom_out_step: f64,
    pub cooldown_ms: u64,
    pub animation_ms: u64,
    pub tick_interval_ms: u64,
    pub idle_threshold_ms: u64,
    pub idle_step: f64,
}

impl Default for ZoomTuning {
    fn default() -> Self {
        Self {
            min_zoom: constants::MIN_ZOOM,
            fallback_max_zoom: constants::FALLBACK_MAX_ZOOM,
            zoom_in_lower_ratio: constants::ZOOM_IN_LOWER_RATIO,
            zoom_in_upper_ratio: constants::ZOOM_IN_UPPER_RATIO,
            ideal_zoom_scale: constants::IDEAL_ZOOM_SCALE,
            zoom_in_step: constants::ZOOM_IN_STEP,
            zoom_out_ratio: constants::ZOOM_OUT_RATIO,
            zoom_out_step: constants::ZOOM_OUT_STEP,
            cooldown_ms: constants::ZOOM_COOLDOWN.as_millis() as u64,
            animation_ms: constants::ZOOM_ANIMATION.as_millis() as u64,
            tick_interval_ms: constants::IDLE_TICK_INTERVAL.as_millis() as u64,
            idle_threshold_ms: constants::IDLE_THRESHOLD.as_millis() as u64,
            idle_step: constants::IDLE_STEP,
        }
    }
}

impl ZoomTuning {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn animation(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_millis(self.idle_threshold_ms)
    }

    /// Zoom that would make a code of this ratio fill the target band
    pub fn ideal_zoom(&self, ratio: f64, max_zoom: f64) -> f64 {
        (self.min_zoom + (self.zoom_in_upper_ratio - ratio) * self.ideal_zoom_scale).min(max_zoom)
    }
}

/// Zoom values owned by the controller
///
/// `min_zoom <= current_zoom, target_zoom <= max_zoom` holds after every
/// controller call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    pub current_zoom: f64,
    pub target_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Last rule adjustment; `None` means the cooldown is already satisfied
    pub last_adjusted_at: Option<Instant>,
}

/// In-flight eased transition of the displayed zoom
#[derive(Debug, Clone, Copy, PartialEq)]
struct ZoomAnimation {
    from: f64,
    to: f64,
    started_at: Instant,
    duration: Duration,
}

impl ZoomAnimation {
    fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    fn value_at(&self, now: Instant) -> f64 {
        self.from + (self.to - self.from) * ease_in_out_cubic(self.progress(now))
    }

    fn is_running(&self, now: Instant) -> bool {
        self.progress(now) < 1.0
    }
}

fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Closed-loop zoom controller for one scan session
#[derive(Debug, Clone)]
pub struct ZoomController {
    tuning: ZoomTuning,
    state: ZoomState,
    animation: Option<ZoomAnimation>,
    last_detection_at: Option<Instant>,
    /// Bumped on every reset; ticks carrying an older epoch are ignored
    epoch: u64,
}

impl ZoomController {
    pub fn new(tuning: ZoomTuning) -> Self {
        let min_zoom = tuning.min_zoom;
        let max_zoom = tuning.fallback_max_zoom.max(min_zoom);
        Self {
            tuning,
            state: ZoomState {
                current_zoom: min_zoom,
                target_zoom: min_zoom,
                min_zoom,
                max_zoom,
                last_adjusted_at: None,
            },
            animation: None,
            last_detection_at: None,
            epoch: 0,
        }
    }

    pub fn tuning(&self) -> &ZoomTuning {
        &self.tuning
    }

    pub fn state(&self) -> &ZoomState {
        &self.state
    }

    pub fn target_zoom(&self) -> f64 {
        self.state.target_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.state.max_zoom
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Displayed zoom at `now`, following any in-flight transition
    pub fn current_zoom(&self, now: Instant) -> f64 {
        let value = match &self.animation {
            Some(animation) => animation.value_at(now),
            None => self.state.current_zoom,
        };
        self.clamp(value)
    }

    /// Whether a rule-triggered transition is still running at `now`
    pub fn is_animating(&self, now: Instant) -> bool {
        self.animation.is_some_and(|a| a.is_running(now))
    }

    /// Feed one filtered detection; returns the zoom to render
    pub fn on_detection(&mut self, event: &DetectionEvent, screen_area: f64) -> f64 {
        let now = event.timestamp;
        self.settle(now);
        self.last_detection_at = Some(now);

        let ratio = event.bounding_box.area() / screen_area;
        if !ratio.is_finite() {
            warn!(ratio, "Ignoring detection with non-finite ratio");
            return self.current_zoom(now);
        }

        if !self.cooldown_elapsed(now) {
            trace!(ratio, "Zoom cooldown active");
            return self.current_zoom(now);
        }

        let tuning = self.tuning;
        let target = self.state.target_zoom;

        if ratio > tuning.zoom_in_lower_ratio
            && ratio < tuning.zoom_in_upper_ratio
            && target < self.state.max_zoom
        {
            let ideal = tuning.ideal_zoom(ratio, self.state.max_zoom);
            let new_target = self.clamp((target + tuning.zoom_in_step).min(ideal));
            if new_target > target {
                debug!(ratio, ideal, from = target, to = new_target, "Zooming in");
                self.adjust(new_target, now);
            } else if new_target < target {
                debug!(ratio, ideal, from = target, to = new_target, "Lowering zoom to ideal");
                self.adjust(new_target, now);
            }
        } else if ratio > tuning.zoom_out_ratio && target > self.state.min_zoom {
            let new_target = self.clamp(target - tuning.zoom_out_step);
            debug!(ratio, from = target, to = new_target, "Zooming out");
            self.adjust(new_target, now);
        }

        self.current_zoom(now)
    }

    /// Idle-reset step, called at the tick cadence
    ///
    /// Once no detection has arrived for the idle threshold, the target is
    /// lowered by `idle_step` per tick until it reaches `min_zoom`. Nothing
    /// happens while a rule-triggered transition is running.
    pub fn tick(&mut self, now: Instant) {
        self.settle(now);

        let idle = self.last_detection_at.is_none_or(|last| {
            now.saturating_duration_since(last) > self.tuning.idle_threshold()
        });
        if !idle || self.state.target_zoom <= self.state.min_zoom || self.animation.is_some() {
            return;
        }

        let new_target = self.clamp(self.state.target_zoom - self.tuning.idle_step);
        trace!(from = self.state.target_zoom, to = new_target, "Idle zoom reset step");
        self.state.target_zoom = new_target;
        self.state.current_zoom = new_target;
    }

    /// Tick issued by a timer started at `epoch`; stale timers are ignored
    pub fn tick_for_epoch(&mut self, epoch: u64, now: Instant) -> bool {
        if epoch != self.epoch {
            trace!(epoch, current = self.epoch, "Dropping stale zoom tick");
            return false;
        }
        self.tick(now);
        true
    }

    /// Apply the real device max zoom, re-clamping all values immediately
    pub fn set_max_zoom(&mut self, max_zoom: f64) {
        if !max_zoom.is_finite() || max_zoom < self.state.min_zoom {
            warn!(max_zoom, "Ignoring invalid device max zoom");
            return;
        }

        debug!(old = self.state.max_zoom, new = max_zoom, "Updating max zoom");
        self.state.max_zoom = max_zoom;
        self.state.target_zoom = self.clamp(self.state.target_zoom);
        self.state.current_zoom = self.clamp(self.state.current_zoom);
        if let Some(animation) = self.animation.as_mut() {
            animation.from = animation.from.min(max_zoom);
            animation.to = animation.to.min(max_zoom);
        }
    }

    /// Drop any transition and return to neutral zoom
    ///
    /// Invalidates timers started before the reset (see
    /// [`Self::tick_for_epoch`]).
    pub fn reset(&mut self) {
        self.animation = None;
        self.state.target_zoom = self.state.min_zoom;
        self.state.current_zoom = self.state.min_zoom;
        self.state.last_adjusted_at = None;
        self.last_detection_at = None;
        self.epoch = self.epoch.wrapping_add(1);
        debug!(epoch = self.epoch, "Zoom controller reset");
    }

    /// [`Self::reset`], and also forget the device's max zoom
    ///
    /// Max zoom returns to the configured fallback until the next device
    /// descriptor arrives.
    pub fn reset_device(&mut self) {
        self.state.max_zoom = self.tuning.fallback_max_zoom.max(self.state.min_zoom);
        self.reset();
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        self.state
            .last_adjusted_at
            .is_none_or(|last| now.saturating_duration_since(last) > self.tuning.cooldown())
    }

    fn adjust(&mut self, new_target: f64, now: Instant) {
        let from = self.current_zoom(now);
        self.state.target_zoom = new_target;
        self.state.last_adjusted_at = Some(now);

        let duration = self.tuning.animation();
        if duration.is_zero() {
            self.animation = None;
            self.state.current_zoom = new_target;
        } else {
            self.animation = Some(ZoomAnimation {
                from,
                to: new_target,
                started_at: now,
                duration,
            });
        }
    }

    /// Fold a finished transition into the stored current zoom
    fn settle(&mut self, now: Instant) {
        if let Some(animation) = self.animation {
            if animation.is_running(now) {
                self.state.current_zoom = self.clamp(animation.value_at(now));
            } else {
                self.state.current_zoom = self.clamp(animation.to);
                self.animation = None;
            }
        }
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.state.min_zoom, self.state.max_zoom)
    }
}
