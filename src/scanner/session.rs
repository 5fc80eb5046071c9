// SPDX-License-Identifier: GPL-3.0-only

//! Scan session lifecycle
//!
//! ```text
//!            activate            granted + device ready
//! Inactive ───────────▶ AwaitingPermission ───────────▶ Active
//!    ▲                                                  │   ▲
//!    │ deactivate (from any state)              suspend │   │ resume
//!    │                                                  ▼   │
//!    └──────────────────────────────────────────────── Suspended
//! ```
//!
//! While active, every detection batch runs through the detection filter,
//! then the zoom controller, then the capture coordinator, so the zoom
//! decision for a frame is always made before its capture is evaluated.
//! An idle ticker task retracts zoom when detections stop; it is cancelled
//! synchronously whenever the session leaves `Active`.

use super::capture::CaptureCoordinator;
use super::filter;
use super::permission::{PermissionGate, PermissionOutcome};
use super::types::{
    ActivationState, CaptureResult, CodeKind, DeviceDescriptor, PermissionState, RawDetection,
    SessionEvent, SessionSnapshot,
};
use super::zoom::ZoomController;
use crate::backends::{CameraDevice, ImagePicker, ScanBackends};
use crate::config::{ScanConfig, Viewport};
use crate::decode;
use crate::errors::{ScanError, ScanResult};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Why a session could not become active
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The platform has no camera; terminal for the session
    NoCamera,
    /// The device descriptor did not arrive within the timeout
    DeviceTimeout,
    /// The device reported an error while initializing
    Device(String),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCamera => write!(f, "No camera available"),
            Self::DeviceTimeout => write!(f, "Camera did not become ready in time"),
            Self::Device(msg) => write!(f, "Camera error: {}", msg),
        }
    }
}

/// Result of an activation or resume attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Scanning
    Active,
    /// Waiting for the user to grant permission (`Denied` or `Blocked`)
    AwaitingUser(PermissionState),
    /// Scanning is not possible right now
    Unavailable(UnavailableReason),
}

/// Handle of the running idle-reset timer
struct IdleTicker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl IdleTicker {
    fn cancel(self) {
        self.token.cancel();
        self.handle.abort();
    }
}

/// One scan screen's detection session
pub struct ScanSession {
    config: ScanConfig,
    gate: PermissionGate,
    device: Arc<dyn CameraDevice>,
    picker: Arc<dyn ImagePicker>,
    activation: ActivationState,
    zoom: Arc<Mutex<ZoomController>>,
    capture: CaptureCoordinator,
    ticker: Option<IdleTicker>,
    viewport: Viewport,
    torch: bool,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl ScanSession {
    pub fn new(config: ScanConfig, backends: ScanBackends) -> Self {
        info!("Creating scan session");
        Self {
            gate: PermissionGate::new(backends.permissions),
            device: backends.device,
            picker: backends.picker,
            activation: ActivationState::Inactive,
            zoom: Arc::new(Mutex::new(ZoomController::new(config.zoom))),
            capture: CaptureCoordinator::new(config.dedup_window()),
            ticker: None,
            viewport: config.viewport,
            torch: false,
            events: None,
            config,
        }
    }

    /// Receive session events; replaces any previous subscriber
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn activation_state(&self) -> ActivationState {
        self.activation
    }

    pub fn permission_state(&self) -> PermissionState {
        self.gate.state()
    }

    /// The session's permission gate, e.g. to watch `Requesting`
    pub fn permission_gate(&self) -> &PermissionGate {
        &self.gate
    }

    pub fn torch_enabled(&self) -> bool {
        self.torch
    }

    /// Zoom for the camera render layer, sampled now
    pub fn current_zoom(&self) -> f64 {
        self.zoom().current_zoom(Instant::now())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let now = Instant::now();
        let zoom = self.zoom();
        SessionSnapshot {
            activation: self.activation,
            permission: self.gate.state(),
            permission_error: self.gate.last_error(),
            current_zoom: zoom.current_zoom(now),
            target_zoom: zoom.target_zoom(),
            max_zoom: zoom.max_zoom(),
            torch: self.torch,
        }
    }

    /// Viewport the preview is rendered into; defines the screen area
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            warn!(width, height, "Ignoring invalid viewport");
            return;
        }
        self.viewport = Viewport { width, height };
    }

    /// Request scanning
    pub async fn activate(&mut self) -> ActivationOutcome {
        match self.activation {
            ActivationState::Active => return ActivationOutcome::Active,
            ActivationState::Suspended => return self.reacquire().await,
            ActivationState::Inactive | ActivationState::AwaitingPermission => {}
        }

        self.set_activation(ActivationState::AwaitingPermission);
        let outcome = self.gate.ensure_permission().await;
        if let Some(outcome) = self.apply_permission(&outcome) {
            return outcome;
        }

        let timeout = self.config.device_timeout();
        let descriptor = tokio::time::timeout(timeout, self.device.descriptor()).await;
        match descriptor {
            Ok(Ok(descriptor)) => self.update_device(descriptor),
            Ok(Err(e)) => {
                warn!(error = %e, "Camera device failed to initialize");
                return self.device_unavailable(UnavailableReason::Device(e.to_string()));
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis(), "Camera device descriptor timed out");
                return self.device_unavailable(UnavailableReason::DeviceTimeout);
            }
        }

        self.start_scanning();
        ActivationOutcome::Active
    }

    /// Tab switch away or app backgrounding
    ///
    /// Cancels the idle ticker and any running zoom transition before
    /// returning; zoom snaps back to neutral.
    pub fn suspend(&mut self) {
        if self.activation != ActivationState::Active {
            debug!(state = ?self.activation, "Suspend ignored, session not active");
            return;
        }
        self.stop_scanning();
        self.torch_off();
        self.set_activation(ActivationState::Suspended);
    }

    /// Return from `Suspended`, provided permission is still granted
    pub async fn resume(&mut self) -> ScanResult<ActivationOutcome> {
        if self.activation != ActivationState::Suspended {
            return Err(ScanError::InvalidState(format!(
                "cannot resume from {:?}",
                self.activation
            )));
        }
        Ok(self.reacquire().await)
    }

    /// Full teardown; all session state is dropped
    pub fn deactivate(&mut self) {
        self.stop_scanning();
        self.zoom().reset_device();
        self.torch_off();
        self.capture.reset();
        self.gate = PermissionGate::new(self.gate.provider());
        self.set_activation(ActivationState::Inactive);
    }

    /// Apply a new device descriptor, e.g. after a camera switch
    pub fn update_device(&mut self, descriptor: DeviceDescriptor) {
        self.zoom().set_max_zoom(descriptor.max_zoom);
    }

    /// Process one scanner batch
    ///
    /// Returns the capture this batch produced, if any. Batches arriving
    /// while the session is not active are dropped.
    pub fn process_batch(&mut self, raw: &[RawDetection]) -> Option<CaptureResult> {
        if self.activation != ActivationState::Active {
            trace!(state = ?self.activation, "Dropping batch, session not active");
            return None;
        }

        let screen_area = self.viewport.area();
        let event = filter::filter(raw, &self.config.detection, screen_area, Instant::now())?;

        let new_target = {
            let mut zoom = self.zoom();
            let before = zoom.target_zoom();
            zoom.on_detection(&event, screen_area);
            let after = zoom.target_zoom();
            (after != before).then_some(after)
        };
        if let Some(target) = new_target {
            self.emit(SessionEvent::ZoomTargetChanged(target));
        }

        let result = self.capture.on_detection(&event)?;
        self.emit(SessionEvent::Scanned(result.clone()));
        Some(result)
    }

    /// Out-of-band capture through the same dedup path
    pub fn inject_external(&mut self, value: &str, kind: CodeKind) -> Option<CaptureResult> {
        let result = self.capture.inject_external(value, kind, Instant::now())?;
        self.emit(SessionEvent::Scanned(result.clone()));
        Some(result)
    }

    /// Let the user pick an image and capture the QR code in it
    ///
    /// A cancelled pick and an image without a code both yield `Ok(None)`.
    pub async fn pick_from_gallery(&mut self) -> ScanResult<Option<CaptureResult>> {
        let Some(path) = self.picker.pick().await? else {
            debug!("Gallery pick cancelled");
            return Ok(None);
        };

        info!(path = %path.display(), "Decoding picked image");
        match decode::decode_image_file(path).await? {
            Some(value) => Ok(self.inject_external(&value, CodeKind::Qr)),
            None => {
                info!("No code found in picked image");
                Ok(None)
            }
        }
    }

    /// Flash pass-through
    pub fn set_torch(&mut self, enabled: bool) -> ScanResult<()> {
        if self.activation != ActivationState::Active {
            return Err(ScanError::InvalidState(
                "torch requires an active session".to_string(),
            ));
        }
        self.device.set_torch(enabled)?;
        self.torch = enabled;
        Ok(())
    }

    pub fn toggle_torch(&mut self) -> ScanResult<bool> {
        let enabled = !self.torch;
        self.set_torch(enabled)?;
        Ok(enabled)
    }

    // ===== Internals =====

    /// Re-check permission and resume scanning from `Suspended`
    async fn reacquire(&mut self) -> ActivationOutcome {
        let outcome = self.gate.ensure_permission().await;
        if let Some(outcome) = self.apply_permission(&outcome) {
            return outcome;
        }
        self.start_scanning();
        ActivationOutcome::Active
    }

    /// Returns the outcome to report when permission is not granted
    fn apply_permission(&mut self, outcome: &PermissionOutcome) -> Option<ActivationOutcome> {
        self.emit(SessionEvent::PermissionChanged(outcome.state));
        match outcome.state {
            PermissionState::Granted => None,
            PermissionState::Unavailable => {
                self.stop_scanning();
                self.set_activation(ActivationState::Inactive);
                Some(ActivationOutcome::Unavailable(UnavailableReason::NoCamera))
            }
            state => {
                self.stop_scanning();
                self.set_activation(ActivationState::AwaitingPermission);
                Some(ActivationOutcome::AwaitingUser(state))
            }
        }
    }

    fn torch_off(&mut self) {
        if self.torch {
            if let Err(e) = self.device.set_torch(false) {
                warn!(error = %e, "Failed to switch torch off");
            }
            self.torch = false;
        }
    }

    fn device_unavailable(&mut self, reason: UnavailableReason) -> ActivationOutcome {
        self.emit(SessionEvent::DeviceUnavailable);
        self.set_activation(ActivationState::Inactive);
        ActivationOutcome::Unavailable(reason)
    }

    fn start_scanning(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        self.ticker = Some(self.spawn_ticker());
        self.set_activation(ActivationState::Active);
    }

    fn stop_scanning(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        // Bumps the zoom epoch so a tick already past its cancellation
        // check cannot touch the reset state
        self.zoom().reset();
    }

    fn spawn_ticker(&self) -> IdleTicker {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let zoom = Arc::clone(&self.zoom);
        let (epoch, period) = {
            let zoom = self.zoom();
            (zoom.epoch(), zoom.tuning().tick_interval())
        };

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let current = lock(&zoom).tick_for_epoch(epoch, Instant::now());
                        if !current {
                            break;
                        }
                    }
                }
            }
            trace!(epoch, "Idle ticker stopped");
        });

        debug!(epoch, period_ms = period.as_millis(), "Idle ticker started");
        IdleTicker { token, handle }
    }

    fn set_activation(&mut self, state: ActivationState) {
        if self.activation != state {
            info!(from = ?self.activation, to = ?state, "Scan session state changed");
            self.activation = state;
            self.emit(SessionEvent::ActivationChanged(state));
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver just means nobody is listening
            let _ = events.send(event);
        }
    }

    fn zoom(&self) -> MutexGuard<'_, ZoomController> {
        lock(&self.zoom)
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }
}

fn lock(zoom: &Mutex<ZoomController>) -> MutexGuard<'_, ZoomController> {
    zoom.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{PathPicker, ScriptedPermissions, StaticDevice};
    use crate::scanner::types::PlatformStatus;
    use std::time::Duration;

    struct Harness {
        session: ScanSession,
        permissions: Arc<ScriptedPermissions>,
        device: Arc<StaticDevice>,
    }

    fn harness(permissions: ScriptedPermissions, device: StaticDevice) -> Harness {
        let permissions = Arc::new(permissions);
        let device = Arc::new(device);
        let backends = ScanBackends::new(
            permissions.clone(),
            device.clone(),
            Arc::new(PathPicker::cancelled()),
        );
        Harness {
            session: ScanSession::new(ScanConfig::default(), backends),
            permissions,
            device,
        }
    }

    fn granted() -> Harness {
        harness(
            ScriptedPermissions::new(PlatformStatus::Granted),
            StaticDevice::new(3.0),
        )
    }

    /// Small code in the default viewport, inside the zoom-in band
    fn small_code(value: &str) -> Vec<RawDetection> {
        vec![RawDetection::new(value, "qr", 100.0, 100.0)]
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_applies_device_max_zoom() {
        let mut h = granted();

        assert_eq!(h.session.activate().await, ActivationOutcome::Active);
        assert_eq!(h.session.activation_state(), ActivationState::Active);
        assert_eq!(h.session.snapshot().max_zoom, 3.0);
        assert_eq!(h.session.current_zoom(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_permission_awaits_user() {
        let mut h = harness(
            ScriptedPermissions::new(PlatformStatus::NotDetermined)
                .answering(PlatformStatus::Denied),
            StaticDevice::new(3.0),
        );

        assert_eq!(
            h.session.activate().await,
            ActivationOutcome::AwaitingUser(PermissionState::Denied)
        );
        assert_eq!(h.session.activation_state(), ActivationState::AwaitingPermission);
        assert!(h.session.process_batch(&small_code("ignored")).is_none());

        // Still denied: no second prompt
        h.session.activate().await;
        assert_eq!(h.permissions.prompt_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_camera_is_unavailable() {
        let mut h = harness(
            ScriptedPermissions::new(PlatformStatus::Unavailable),
            StaticDevice::new(3.0),
        );

        assert_eq!(
            h.session.activate().await,
            ActivationOutcome::Unavailable(UnavailableReason::NoCamera)
        );
        assert_eq!(h.session.activation_state(), ActivationState::Inactive);
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_timeout_reports_unavailable_once() {
        let mut h = harness(
            ScriptedPermissions::new(PlatformStatus::Granted),
            StaticDevice::never_ready(),
        );
        let mut events = h.session.subscribe();

        assert_eq!(
            h.session.activate().await,
            ActivationOutcome::Unavailable(UnavailableReason::DeviceTimeout)
        );
        assert_eq!(h.session.activation_state(), ActivationState::Inactive);

        let mut unavailable = 0;
        while let Ok(event) = events.try_recv() {
            if event == SessionEvent::DeviceUnavailable {
                unavailable += 1;
            }
        }
        assert_eq!(unavailable, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_error_reports_unavailable_once() {
        let mut h = harness(
            ScriptedPermissions::new(PlatformStatus::Granted),
            StaticDevice::failing("sensor offline"),
        );
        let mut events = h.session.subscribe();

        assert_eq!(
            h.session.activate().await,
            ActivationOutcome::Unavailable(UnavailableReason::Device(
                "Backend error: sensor offline".to_string()
            ))
        );
        assert_eq!(h.session.activation_state(), ActivationState::Inactive);

        let mut unavailable = 0;
        while let Ok(event) = events.try_recv() {
            if event == SessionEvent::DeviceUnavailable {
                unavailable += 1;
            }
        }
        assert_eq!(unavailable, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_zooms_then_captures_once() {
        let mut h = granted();
        let mut events = h.session.subscribe();
        h.session.activate().await;

        let first = h.session.process_batch(&small_code("https://example.com"));
        assert_eq!(first.map(|c| c.value), Some("https://example.com".to_string()));
        assert!((h.session.snapshot().target_zoom - 1.15).abs() < 1e-9);

        // Same value inside the dedup window
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(h.session.process_batch(&small_code("https://example.com")).is_none());

        let mut saw_zoom = false;
        let mut scanned = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                SessionEvent::ZoomTargetChanged(_) => saw_zoom = true,
                SessionEvent::Scanned(_) => scanned += 1,
                _ => {}
            }
        }
        assert!(saw_zoom);
        assert_eq!(scanned, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_ticker_returns_zoom_to_neutral() {
        let mut h = granted();
        h.session.activate().await;

        h.session.process_batch(&small_code("code"));
        assert!(h.session.snapshot().target_zoom > 1.0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let snapshot = h.session.snapshot();
        assert_eq!(snapshot.target_zoom, 1.0);
        assert_eq!(snapshot.current_zoom, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspend_mid_transition_snaps_to_neutral() {
        let mut h = granted();
        h.session.activate().await;
        h.session.process_batch(&small_code("code"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(h.session.current_zoom() > 1.0);

        h.session.suspend();
        assert_eq!(h.session.activation_state(), ActivationState::Suspended);
        assert_eq!(h.session.current_zoom(), 1.0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.session.current_zoom(), 1.0);
        assert!(h.session.process_batch(&small_code("code")).is_none());

        assert_eq!(h.session.resume().await.unwrap(), ActivationOutcome::Active);
        assert_eq!(h.session.activation_state(), ActivationState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_requires_suspended() {
        let mut h = granted();
        assert!(matches!(
            h.session.resume().await,
            Err(ScanError::InvalidState(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_after_revocation_awaits_user() {
        let mut h = granted();
        h.session.activate().await;
        h.session.suspend();

        h.permissions.set_status(PlatformStatus::Blocked);
        assert_eq!(
            h.session.resume().await.unwrap(),
            ActivationOutcome::AwaitingUser(PermissionState::Blocked)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_torch_requires_active_session() {
        let mut h = granted();
        assert!(h.session.set_torch(true).is_err());

        h.session.activate().await;
        assert!(h.session.toggle_torch().unwrap());
        assert!(h.device.torch_enabled());

        h.session.deactivate();
        assert!(!h.device.torch_enabled());
        assert!(!h.session.torch_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspend_switches_torch_off() {
        let mut h = granted();
        h.session.activate().await;
        h.session.set_torch(true).unwrap();

        h.session.suspend();
        assert!(!h.device.torch_enabled());
        assert!(!h.session.torch_enabled());
        assert!(!h.session.snapshot().torch);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivate_forgets_device_max_zoom() {
        let mut h = granted();
        h.session.activate().await;
        assert_eq!(h.session.snapshot().max_zoom, 3.0);

        h.session.deactivate();
        assert_eq!(
            h.session.snapshot().max_zoom,
            crate::constants::FALLBACK_MAX_ZOOM
        );

        // The next activation picks the device max up again
        assert_eq!(h.session.activate().await, ActivationOutcome::Active);
        assert_eq!(h.session.snapshot().max_zoom, 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_capture_shares_dedup_with_camera() {
        let mut h = granted();
        h.session.activate().await;

        assert!(h.session.process_batch(&small_code("shared")).is_some());
        assert!(h.session.inject_external("shared", CodeKind::Qr).is_none());
        assert!(h.session.inject_external("other", CodeKind::Qr).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_gallery_pick_is_none() {
        let mut h = granted();
        assert!(h.session.pick_from_gallery().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivate_drops_permission_state() {
        let mut h = granted();
        h.session.activate().await;
        assert_eq!(h.session.permission_state(), PermissionState::Granted);

        h.session.deactivate();
        assert_eq!(h.session.activation_state(), ActivationState::Inactive);
        assert_eq!(h.session.permission_state(), PermissionState::NotDetermined);
        assert_eq!(h.session.current_zoom(), 1.0);
    }
}
