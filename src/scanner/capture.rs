// SPDX-License-Identifier: GPL-3.0-only

//! Capture coordinator
//!
//! Turns the stream of filtered detections into scan results, emitting each
//! distinct capture exactly once. A value identical to the previous capture
//! is suppressed while it is still within the dedup window; a different
//! value is always emitted.

use super::types::{CaptureResult, CodeKind, DetectionEvent};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Last emitted capture, used only for dedup
#[derive(Debug, Clone, Default, PartialEq)]
struct CaptureRecord {
    last_value: Option<String>,
    last_captured_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct CaptureCoordinator {
    dedup_window: Duration,
    record: CaptureRecord,
}

impl CaptureCoordinator {
    pub fn new(dedup_window: Duration) -> Self {
        Self {
            dedup_window,
            record: CaptureRecord::default(),
        }
    }

    pub fn dedup_window(&self) -> Duration {
        self.dedup_window
    }

    /// Evaluate a camera detection
    pub fn on_detection(&mut self, event: &DetectionEvent) -> Option<CaptureResult> {
        self.capture(&event.value, event.kind, event.timestamp)
    }

    /// Evaluate an out-of-band capture, e.g. a code decoded from a picked image
    pub fn inject_external(
        &mut self,
        value: &str,
        kind: CodeKind,
        now: Instant,
    ) -> Option<CaptureResult> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        self.capture(value, kind, now)
    }

    /// Forget the last capture
    pub fn reset(&mut self) {
        self.record = CaptureRecord::default();
    }

    fn capture(&mut self, value: &str, kind: CodeKind, now: Instant) -> Option<CaptureResult> {
        if self.is_duplicate(value, now) {
            debug!(value, "Suppressing duplicate capture");
            return None;
        }

        self.record = CaptureRecord {
            last_value: Some(value.to_string()),
            last_captured_at: Some(now),
        };
        info!(value, %kind, "Code captured");
        Some(CaptureResult::new(value.to_string(), kind))
    }

    fn is_duplicate(&self, value: &str, now: Instant) -> bool {
        match (&self.record.last_value, self.record.last_captured_at) {
            (Some(last), Some(at)) => {
                last == value && now.saturating_duration_since(at) < self.dedup_window
            }
            _ => false,
        }
    }
}
