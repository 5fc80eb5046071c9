// SPDX-License-Identifier: GPL-3.0-only

//! Platform collaborators of the scan loop
//!
//! Every platform capability the scan session needs is a trait here, with
//! implementations chosen when the session is built:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                ScanSession                   │
//! └──────┬───────────────┬───────────────┬──────┘
//!        │               │               │
//! ┌──────┴──────┐ ┌──────┴──────┐ ┌──────┴──────┐
//! │ Permission  │ │   Camera    │ │   Image     │
//! │  Provider   │ │   Device    │ │   Picker    │
//! └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! Platform APIs are callback based on some systems and blocking on others;
//! all of them are presented as futures so they compose the same way.
//!
//! # Modules
//!
//! - [`permission`]: camera permission primitives
//! - [`device`]: camera capability descriptor and torch
//! - [`picker`]: gallery image selection

pub mod device;
pub mod permission;
pub mod picker;

pub use device::{StaticDevice, SysfsTorchDevice};
pub use permission::{DevicePresencePermissions, ScriptedPermissions};
pub use picker::PathPicker;

use crate::errors::{DeviceError, PermissionError, PickerError};
use crate::scanner::types::{DeviceDescriptor, PlatformStatus};
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;

/// Platform camera permission primitive
pub trait PermissionProvider: Send + Sync {
    /// Current status, without prompting
    fn check(&self) -> BoxFuture<'_, Result<PlatformStatus, PermissionError>>;

    /// Show the platform prompt and report the answer
    fn request(&self) -> BoxFuture<'_, Result<PlatformStatus, PermissionError>>;
}

/// Camera device as seen by the scan loop
pub trait CameraDevice: Send + Sync {
    /// Resolves once the device is initialized
    ///
    /// May never resolve; callers bound the wait.
    fn descriptor(&self) -> BoxFuture<'_, Result<DeviceDescriptor, DeviceError>>;

    /// Switch the torch on or off
    fn set_torch(&self, enabled: bool) -> Result<(), DeviceError>;
}

/// Gallery image picker
pub trait ImagePicker: Send + Sync {
    /// `Ok(None)` when the user cancelled
    fn pick(&self) -> BoxFuture<'_, Result<Option<PathBuf>, PickerError>>;
}

/// The set of collaborators a scan session is built with
#[derive(Clone)]
pub struct ScanBackends {
    pub permissions: Arc<dyn PermissionProvider>,
    pub device: Arc<dyn CameraDevice>,
    pub picker: Arc<dyn ImagePicker>,
}

impl ScanBackends {
    pub fn new(
        permissions: Arc<dyn PermissionProvider>,
        device: Arc<dyn CameraDevice>,
        picker: Arc<dyn ImagePicker>,
    ) -> Self {
        Self {
            permissions,
            device,
            picker,
        }
    }
}
