// SPDX-License-Identifier: GPL-3.0-only

//! Camera device collaborators

use super::CameraDevice;
use crate::errors::DeviceError;
use crate::flash::TorchLeds;
use crate::scanner::types::DeviceDescriptor;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Device with a fixed descriptor, ready after an optional delay
///
/// A device built with [`StaticDevice::never_ready`] never delivers its
/// descriptor, which exercises the activation timeout. One built with
/// [`StaticDevice::failing`] reports a backend error instead.
#[derive(Debug)]
pub struct StaticDevice {
    readiness: Readiness,
    ready_after: Duration,
    torch: AtomicBool,
}

#[derive(Debug, Clone)]
enum Readiness {
    Ready(DeviceDescriptor),
    Never,
    Fails(String),
}

impl StaticDevice {
    fn with(readiness: Readiness) -> Self {
        Self {
            readiness,
            ready_after: Duration::ZERO,
            torch: AtomicBool::new(false),
        }
    }

    pub fn new(max_zoom: f64) -> Self {
        Self::with(Readiness::Ready(DeviceDescriptor { max_zoom }))
    }

    pub fn never_ready() -> Self {
        Self::with(Readiness::Never)
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with(Readiness::Fails(message.into()))
    }

    pub fn ready_after(mut self, delay: Duration) -> Self {
        self.ready_after = delay;
        self
    }

    pub fn torch_enabled(&self) -> bool {
        self.torch.load(Ordering::SeqCst)
    }
}

impl CameraDevice for StaticDevice {
    fn descriptor(&self) -> BoxFuture<'_, Result<DeviceDescriptor, DeviceError>> {
        async move {
            if !self.ready_after.is_zero() {
                tokio::time::sleep(self.ready_after).await;
            }
            match &self.readiness {
                Readiness::Ready(descriptor) => Ok(*descriptor),
                Readiness::Fails(message) => Err(DeviceError::Backend(message.clone())),
                Readiness::Never => futures::future::pending().await,
            }
        }
        .boxed()
    }

    fn set_torch(&self, enabled: bool) -> Result<(), DeviceError> {
        self.torch.store(enabled, Ordering::SeqCst);
        Ok(())
    }
}

/// Device whose torch is driven through sysfs flash LEDs
#[derive(Debug)]
pub struct SysfsTorchDevice {
    descriptor: DeviceDescriptor,
    leds: TorchLeds,
}

impl SysfsTorchDevice {
    pub fn new(max_zoom: f64, leds: TorchLeds) -> Self {
        Self {
            descriptor: DeviceDescriptor { max_zoom },
            leds,
        }
    }

    /// Discover the flash LEDs of this machine
    pub fn discover(max_zoom: f64) -> Self {
        Self::new(max_zoom, TorchLeds::discover())
    }
}

impl CameraDevice for SysfsTorchDevice {
    fn descriptor(&self) -> BoxFuture<'_, Result<DeviceDescriptor, DeviceError>> {
        futures::future::ready(Ok(self.descriptor)).boxed()
    }

    fn set_torch(&self, enabled: bool) -> Result<(), DeviceError> {
        if self.leds.is_empty() {
            debug!("No flash LEDs, torch request ignored");
            return Err(DeviceError::NotFound);
        }
        self.leds
            .set_enabled(enabled)
            .map_err(|e| DeviceError::Backend(e.to_string()))
    }
}
