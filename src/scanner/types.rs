// SPDX-License-Identifier: GPL-3.0-only

//! Core types shared by the scan loop components
//!
//! Raw scanner readings come in as [`RawDetection`]; the detection filter
//! reduces a batch to at most one [`DetectionEvent`], which feeds the zoom
//! controller and the capture coordinator.

use super::payload::ScanPayload;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

/// Symbology family of a detected code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeKind {
    /// QR code
    Qr,
    /// Any linear or other 2D barcode (EAN, Code 128, PDF417, ...)
    Barcode,
}

impl CodeKind {
    /// Map a scanner-reported type string onto a code kind
    ///
    /// Scanners report symbology names such as `qr`, `ean-13` or
    /// `code-128`. Anything that is not QR is treated as a barcode.
    pub fn from_scanner_type(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "qr" | "qr-code" | "qrcode" | "qr_code" => Self::Qr,
            _ => Self::Barcode,
        }
    }
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qr => write!(f, "QR"),
            Self::Barcode => write!(f, "Barcode"),
        }
    }
}

/// Size of a detected code, in the scanner's frame units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// One reading as delivered by the scanner provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Decoded content
    pub value: String,
    /// Scanner-reported symbology name
    #[serde(rename = "type")]
    pub kind: String,
    /// Bounding box of the code within the frame
    pub frame: BoundingBox,
}

impl RawDetection {
    pub fn new(value: impl Into<String>, kind: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            value: value.into(),
            kind: kind.into(),
            frame: BoundingBox::new(width, height),
        }
    }
}

/// A validated scanner reading
///
/// Produced by [`super::filter::filter`]; its geometry is finite and
/// non-degenerate, and its value is trimmed and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    pub value: String,
    pub kind: CodeKind,
    pub bounding_box: BoundingBox,
    pub timestamp: Instant,
}

/// A capture emitted to the hosting UI
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureResult {
    pub value: String,
    pub kind: CodeKind,
    /// Action parsed from the value
    pub payload: ScanPayload,
}

impl CaptureResult {
    pub fn new(value: String, kind: CodeKind) -> Self {
        let payload = ScanPayload::parse(&value);
        Self {
            value,
            kind,
            payload,
        }
    }
}

/// Camera permission as tracked by the permission gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PermissionState {
    #[default]
    NotDetermined,
    /// A platform prompt is in flight
    Requesting,
    Granted,
    /// Refused, but the platform may ask again
    Denied,
    /// Refused permanently; only system settings can change it
    Blocked,
    /// No camera capability on this platform
    Unavailable,
}

impl PermissionState {
    /// Whether the hosting UI should offer an "open settings" affordance
    pub fn needs_settings(&self) -> bool {
        matches!(self, Self::Denied | Self::Blocked)
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotDetermined => "not determined",
            Self::Requesting => "requesting",
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Blocked => "blocked",
            Self::Unavailable => "unavailable",
        };
        write!(f, "{}", name)
    }
}

/// Status reported by a platform permission primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformStatus {
    /// The user has not been asked yet
    NotDetermined,
    Granted,
    Denied,
    Blocked,
    /// The platform has no camera at all
    Unavailable,
}

impl From<PlatformStatus> for PermissionState {
    fn from(status: PlatformStatus) -> Self {
        match status {
            PlatformStatus::NotDetermined => PermissionState::NotDetermined,
            PlatformStatus::Granted => PermissionState::Granted,
            PlatformStatus::Denied => PermissionState::Denied,
            PlatformStatus::Blocked => PermissionState::Blocked,
            PlatformStatus::Unavailable => PermissionState::Unavailable,
        }
    }
}

/// Activation lifecycle of a scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActivationState {
    #[default]
    Inactive,
    AwaitingPermission,
    Active,
    Suspended,
}

/// Capability descriptor delivered by the camera once it is initialized
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub max_zoom: f64,
}

/// Read-only view of a session for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub activation: ActivationState,
    pub permission: PermissionState,
    /// Last error reported by the permission primitive, if any
    pub permission_error: Option<String>,
    pub current_zoom: f64,
    pub target_zoom: f64,
    pub max_zoom: f64,
    pub torch: bool,
}

/// Notifications pushed to the hosting UI
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A distinct capture was made (`onScanned`)
    Scanned(CaptureResult),
    PermissionChanged(PermissionState),
    ActivationChanged(ActivationState),
    /// The camera did not report a descriptor in time
    DeviceUnavailable,
    /// The zoom controller picked a new target
    ZoomTargetChanged(f64),
}
