// SPDX-License-Identifier: GPL-3.0-only

//! Adaptive code scanning loop
//!
//! ```text
//! scanner batch ──▶ filter ──▶ zoom controller ──▶ capture coordinator ──▶ onScanned
//!                                    ▲                      ▲
//!                         idle ticker┘       gallery decode ┘
//! ```
//!
//! # Modules
//!
//! - [`permission`]: camera permission gate with request coalescing
//! - [`filter`]: per-batch detection selection
//! - [`zoom`]: closed-loop auto zoom
//! - [`capture`]: duplicate suppression
//! - [`session`]: lifecycle orchestration
//! - [`payload`]: classification of captured values
//! - [`types`]: shared data types

pub mod capture;
pub mod filter;
pub mod payload;
pub mod permission;
pub mod session;
pub mod types;
pub mod zoom;

pub use capture::CaptureCoordinator;
pub use filter::DetectionLimits;
pub use payload::ScanPayload;
pub use permission::{PermissionGate, PermissionOutcome};
pub use session::{ActivationOutcome, ScanSession, UnavailableReason};
pub use types::{
    ActivationState, BoundingBox, CaptureResult, CodeKind, DetectionEvent, DeviceDescriptor,
    PermissionState, PlatformStatus, RawDetection, SessionEvent, SessionSnapshot,
};
pub use zoom::{ZoomController, ZoomState, ZoomTuning};
