// SPDX-License-Identifier: GPL-3.0-only

//! Detection filter
//!
//! Reduces one scanner batch to at most one actionable detection. Noise
//! (blank values, far-away or degenerate boxes) is dropped silently: an
//! empty result is the normal "nothing this frame" case, not an error.

use super::types::{CodeKind, DetectionEvent, RawDetection};
use crate::constants::MIN_BOX_SIDE;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::trace;

/// Largest bounding-box ratio that is still physically meaningful
const MAX_RATIO: f64 = 1.0;

/// Geometry thresholds for accepting a detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionLimits {
    /// Both box sides must be at least this long (frame units)
    pub min_box_side: f64,
}

impl Default for DetectionLimits {
    fn default() -> Self {
        Self {
            min_box_side: MIN_BOX_SIDE,
        }
    }
}

/// Pick the first qualifying detection of a batch
///
/// Entries are considered in scanner order. An entry qualifies when its
/// trimmed value is non-empty, both box sides are finite and at least
/// `limits.min_box_side`, and its area ratio against `screen_area` lies in
/// `(0, 1]`. The ratio check keeps NaN and out-of-range geometry away from
/// the zoom controller.
pub fn filter(
    raw: &[RawDetection],
    limits: &DetectionLimits,
    screen_area: f64,
    now: Instant,
) -> Option<DetectionEvent> {
    if !(screen_area.is_finite() && screen_area > 0.0) {
        trace!(screen_area, "Rejecting batch: no usable screen area");
        return None;
    }

    raw.iter().find_map(|entry| {
        let value = entry.value.trim();
        if value.is_empty() {
            return None;
        }

        let frame = entry.frame;
        if !(frame.width.is_finite() && frame.height.is_finite()) {
            return None;
        }
        if frame.width < limits.min_box_side || frame.height < limits.min_box_side {
            trace!(
                width = frame.width,
                height = frame.height,
                "Rejecting undersized detection"
            );
            return None;
        }

        let ratio = frame.area() / screen_area;
        if !(ratio.is_finite() && ratio > 0.0 && ratio <= MAX_RATIO) {
            trace!(ratio, "Rejecting detection with out-of-range ratio");
            return None;
        }

        Some(DetectionEvent {
            value: value.to_string(),
            kind: CodeKind::from_scanner_type(&entry.kind),
            bounding_box: frame,
            timestamp: now,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: f64 = 1000.0 * 1000.0;

    fn run(raw: &[RawDetection]) -> Option<DetectionEvent> {
        filter(raw, &DetectionLimits::default(), SCREEN, Instant::now())
    }

    #[test]
    fn test_empty_batch() {
        assert!(run(&[]).is_none());
    }

    #[test]
    fn test_picks_first_qualifying_entry() {
        let raw = vec![
            RawDetection::new("   ", "qr", 100.0, 100.0),
            RawDetection::new("tiny", "qr", 5.0, 100.0),
            RawDetection::new("first", "ean-13", 100.0, 40.0),
            RawDetection::new("second", "qr", 200.0, 200.0),
        ];

        let event = run(&raw).unwrap();
        assert_eq!(event.value, "first");
        assert_eq!(event.kind, CodeKind::Barcode);
        assert_eq!(event.bounding_box.width, 100.0);
    }

    #[test]
    fn test_value_is_trimmed() {
        let event = run(&[RawDetection::new("  abc\n", "qr", 50.0, 50.0)]).unwrap();
        assert_eq!(event.value, "abc");
        assert_eq!(event.kind, CodeKind::Qr);
    }

    #[test]
    fn test_rejects_non_finite_geometry() {
        let raw = vec![
            RawDetection::new("nan", "qr", f64::NAN, 100.0),
            RawDetection::new("inf", "qr", 100.0, f64::INFINITY),
        ];
        assert!(run(&raw).is_none());
    }

    #[test]
    fn test_rejects_box_larger_than_screen() {
        let raw = vec![RawDetection::new("huge", "qr", 2000.0, 2000.0)];
        assert!(run(&raw).is_none());
    }

    #[test]
    fn test_rejects_unusable_screen_area() {
        let raw = vec![RawDetection::new("ok", "qr", 100.0, 100.0)];
        let limits = DetectionLimits::default();
        assert!(filter(&raw, &limits, 0.0, Instant::now()).is_none());
        assert!(filter(&raw, &limits, f64::NAN, Instant::now()).is_none());
    }

    #[test]
    fn test_custom_min_side() {
        let raw = vec![RawDetection::new("small", "qr", 8.0, 8.0)];
        let limits = DetectionLimits { min_box_side: 5.0 };
        assert!(filter(&raw, &limits, SCREEN, Instant::now()).is_some());
    }
}
