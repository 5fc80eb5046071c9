// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Replaying detection traces through a scan session
//! - Decoding codes from image files
//! - Printing the effective configuration

use codescan::backends::{
    DevicePresencePermissions, PathPicker, ScriptedPermissions, StaticDevice, SysfsTorchDevice,
};
use codescan::scanner::{ActivationOutcome, PlatformStatus, RawDetection};
use codescan::{ScanBackends, ScanConfig, ScanSession};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// One recorded scanner batch
#[derive(Debug, Deserialize)]
struct TraceFrame {
    /// Offset from the start of the trace
    at_ms: u64,
    #[serde(default)]
    detections: Vec<RawDetection>,
}

/// Load the config file if one was given, defaults otherwise
pub fn load_config(path: Option<&Path>) -> Result<ScanConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(ScanConfig::load(path)?),
        None => Ok(ScanConfig::default()),
    }
}

pub fn print_config(config: &ScanConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config.to_json()?);
    Ok(())
}

/// Replay a detection trace in real time
pub fn simulate(
    config: ScanConfig,
    trace: &Path,
    max_zoom: f64,
    settle_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(trace)?;
    let mut frames: Vec<TraceFrame> = serde_json::from_str(&contents)?;
    frames.sort_by_key(|frame| frame.at_ms);
    println!("Replaying {} frames from {}", frames.len(), trace.display());

    let backends = ScanBackends::new(
        Arc::new(ScriptedPermissions::new(PlatformStatus::Granted)),
        Arc::new(StaticDevice::new(max_zoom)),
        Arc::new(PathPicker::cancelled()),
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut session = ScanSession::new(config, backends);
        match session.activate().await {
            ActivationOutcome::Active => {}
            other => return Err(format!("Session did not activate: {:?}", other).into()),
        }

        let start = Instant::now();
        let mut captures = 0;
        for frame in &frames {
            tokio::time::sleep_until(start + Duration::from_millis(frame.at_ms)).await;

            let captured = session.process_batch(&frame.detections);
            let snapshot = session.snapshot();
            print!(
                "[{:>6} ms] zoom {:.2} -> {:.2}",
                frame.at_ms, snapshot.current_zoom, snapshot.target_zoom
            );
            match captured {
                Some(result) => {
                    captures += 1;
                    println!(
                        "  captured {} ({}): {}",
                        result.kind,
                        result.payload.action_label(),
                        result.value
                    );
                }
                None => println!(),
            }
        }

        if settle_ms > 0 {
            let last = frames.last().map(|frame| frame.at_ms).unwrap_or(0);
            let mut elapsed = 0;
            let step = session.config().zoom.tick_interval_ms.max(1);
            while elapsed < settle_ms {
                elapsed = (elapsed + step).min(settle_ms);
                tokio::time::sleep_until(start + Duration::from_millis(last + elapsed)).await;
                let snapshot = session.snapshot();
                println!(
                    "[{:>6} ms] zoom {:.2} -> {:.2}  (idle)",
                    last + elapsed,
                    snapshot.current_zoom,
                    snapshot.target_zoom
                );
            }
        }

        session.deactivate();
        println!();
        println!("{} capture(s)", captures);
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}

/// Decode a code from an image through the gallery path
pub fn decode(config: ScanConfig, image: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let max_zoom = config.zoom.fallback_max_zoom;
    let backends = ScanBackends::new(
        Arc::new(DevicePresencePermissions::default()),
        Arc::new(SysfsTorchDevice::discover(max_zoom)),
        Arc::new(PathPicker::new(image)),
    );

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async move {
        let mut session = ScanSession::new(config, backends);
        session.pick_from_gallery().await
    })?;

    match result {
        Some(result) => {
            println!("Type:   {}", result.kind);
            println!("Action: {}", result.payload.action_label());
            println!("Value:  {}", result.value);
        }
        None => println!("No code found."),
    }

    Ok(())
}
