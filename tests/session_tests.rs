// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the scan session loop

use codescan::backends::{PathPicker, ScriptedPermissions, StaticDevice};
use codescan::scanner::{
    ActivationOutcome, ActivationState, DeviceDescriptor, PermissionState, PlatformStatus,
    RawDetection, ScanSession, SessionEvent,
};
use codescan::{ScanBackends, ScanConfig, ScanPayload};
use std::sync::Arc;
use std::time::Duration;

const EPS: f64 = 1e-9;

fn session_with(permissions: Arc<ScriptedPermissions>, max_zoom: f64) -> ScanSession {
    let backends = ScanBackends::new(
        permissions,
        Arc::new(StaticDevice::new(max_zoom)),
        Arc::new(PathPicker::cancelled()),
    );
    ScanSession::new(ScanConfig::default(), backends)
}

fn code(value: &str, side: f64) -> Vec<RawDetection> {
    vec![RawDetection::new(value, "qr", side, side)]
}

async fn at(ms: u64, start: tokio::time::Instant) {
    tokio::time::sleep_until(start + Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_activation_shares_prompt_with_other_callers() {
    let permissions = Arc::new(
        ScriptedPermissions::new(PlatformStatus::NotDetermined)
            .with_prompt_delay(Duration::from_millis(300)),
    );
    let mut session = session_with(permissions.clone(), 3.0);
    let gate = session.permission_gate().clone();

    let (outcome, other) = tokio::join!(session.activate(), gate.ensure_permission());

    assert_eq!(outcome, ActivationOutcome::Active);
    assert!(other.is_granted());
    assert_eq!(permissions.prompt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_approaching_code_zooms_in_stepwise() {
    let permissions = Arc::new(ScriptedPermissions::new(PlatformStatus::Granted));
    let mut session = session_with(permissions, 3.0);
    session.activate().await;
    let start = tokio::time::Instant::now();

    // 60x60 in the default 1080x1920 viewport, well inside the zoom-in band
    session.process_batch(&code("menu", 60.0));
    assert!((session.snapshot().target_zoom - 1.15).abs() < EPS);

    // Inside the cooldown
    at(200, start).await;
    session.process_batch(&code("menu", 60.0));
    assert!((session.snapshot().target_zoom - 1.15).abs() < EPS);

    at(450, start).await;
    session.process_batch(&code("menu", 60.0));
    assert!((session.snapshot().target_zoom - 1.30).abs() < EPS);

    at(900, start).await;
    session.process_batch(&code("menu", 60.0));
    assert!((session.snapshot().target_zoom - 1.45).abs() < EPS);
    assert!(session.current_zoom() <= session.snapshot().target_zoom);
}

#[tokio::test(start_paused = true)]
async fn test_large_code_zooms_out() {
    let permissions = Arc::new(ScriptedPermissions::new(PlatformStatus::Granted));
    let mut session = session_with(permissions, 3.0);
    session.activate().await;
    let start = tokio::time::Instant::now();

    for (i, ms) in [0, 450, 900].into_iter().enumerate() {
        at(ms, start).await;
        session.process_batch(&code(&format!("small-{}", i), 60.0));
    }
    let zoomed = session.snapshot().target_zoom;
    assert!(zoomed > 1.3);

    // 700x700 covers about a quarter of the viewport
    at(1350, start).await;
    session.process_batch(&code("big", 700.0));
    assert!((session.snapshot().target_zoom - (zoomed - 0.2)).abs() < EPS);
}

#[tokio::test(start_paused = true)]
async fn test_device_update_reclamps_immediately() {
    let permissions = Arc::new(ScriptedPermissions::new(PlatformStatus::Granted));
    let mut session = session_with(permissions, 3.0);
    session.activate().await;
    let start = tokio::time::Instant::now();

    for ms in [0, 450, 900] {
        at(ms, start).await;
        session.process_batch(&code("menu", 60.0));
    }
    assert!(session.snapshot().target_zoom > 1.4);

    session.update_device(DeviceDescriptor { max_zoom: 1.2 });
    let snapshot = session.snapshot();
    assert_eq!(snapshot.max_zoom, 1.2);
    assert_eq!(snapshot.target_zoom, 1.2);
    assert!(snapshot.current_zoom <= 1.2);
}

#[tokio::test(start_paused = true)]
async fn test_zoom_decision_precedes_capture() {
    let permissions = Arc::new(ScriptedPermissions::new(PlatformStatus::Granted));
    let mut session = session_with(permissions, 3.0);
    let mut events = session.subscribe();
    session.activate().await;

    let result = session
        .process_batch(&code("https://example.com", 60.0))
        .unwrap();
    assert_eq!(result.payload, ScanPayload::Url("https://example.com".to_string()));

    let mut batch_events = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::ZoomTargetChanged(_) | SessionEvent::Scanned(_) => {
                batch_events.push(event)
            }
            _ => {}
        }
    }
    assert!(matches!(batch_events[0], SessionEvent::ZoomTargetChanged(_)));
    assert!(matches!(batch_events[1], SessionEvent::Scanned(_)));
}

#[tokio::test(start_paused = true)]
async fn test_same_code_recaptured_after_dedup_window() {
    let permissions = Arc::new(ScriptedPermissions::new(PlatformStatus::Granted));
    let mut session = session_with(permissions, 3.0);
    session.activate().await;
    let start = tokio::time::Instant::now();

    assert!(session.process_batch(&code("ticket", 300.0)).is_some());
    at(1999, start).await;
    assert!(session.process_batch(&code("ticket", 300.0)).is_none());
    at(2001, start).await;
    assert!(session.process_batch(&code("ticket", 300.0)).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_suspend_stops_idle_reset_for_good() {
    let permissions = Arc::new(ScriptedPermissions::new(PlatformStatus::Granted));
    let mut session = session_with(permissions, 3.0);
    let mut events = session.subscribe();
    session.activate().await;

    session.process_batch(&code("menu", 60.0));
    tokio::time::sleep(Duration::from_millis(150)).await;
    session.suspend();
    assert_eq!(session.current_zoom(), 1.0);

    // Drain, then make sure no zoom activity happens while suspended
    while events.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(events.try_recv().is_err());
    assert_eq!(session.snapshot().target_zoom, 1.0);
    assert_eq!(session.activation_state(), ActivationState::Suspended);
}

#[tokio::test(start_paused = true)]
async fn test_permission_granted_in_settings_unblocks_activation() {
    let permissions = Arc::new(ScriptedPermissions::new(PlatformStatus::Blocked));
    let mut session = session_with(permissions.clone(), 3.0);

    assert_eq!(
        session.activate().await,
        ActivationOutcome::AwaitingUser(PermissionState::Blocked)
    );
    assert!(session.permission_state().needs_settings());

    permissions.set_status(PlatformStatus::Granted);
    assert_eq!(session.activate().await, ActivationOutcome::Active);
    assert_eq!(permissions.prompt_count(), 0);
}

#[tokio::test]
async fn test_gallery_image_without_code() {
    let path = std::env::temp_dir().join(format!("codescan-gallery-{}.png", std::process::id()));
    image::GrayImage::from_pixel(32, 32, image::Luma([0u8]))
        .save(&path)
        .unwrap();

    let backends = ScanBackends::new(
        Arc::new(ScriptedPermissions::new(PlatformStatus::Granted)),
        Arc::new(StaticDevice::new(3.0)),
        Arc::new(PathPicker::new(path.clone())),
    );
    let mut session = ScanSession::new(ScanConfig::default(), backends);

    assert!(session.pick_from_gallery().await.unwrap().is_none());

    std::fs::remove_file(&path).unwrap();
}
