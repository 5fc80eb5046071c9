// SPDX-License-Identifier: GPL-3.0-only

//! Codescan - adaptive QR and barcode scanning
//!
//! This library drives a camera scanning screen: it gates camera access on
//! permission, filters raw scanner detections, zooms the camera towards
//! small codes and back out when they fill the frame, and emits each
//! distinct code once.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`scanner`]: The scan loop (permission, filter, zoom, capture, session)
//! - [`backends`]: Platform permission, camera device and image picker
//! - [`decode`]: QR decoding of still images
//! - [`flash`]: Sysfs flash LED control
//! - [`config`]: Tuning configuration
//!
//! # Example
//!
//! ```ignore
//! let mut session = ScanSession::new(ScanConfig::default(), backends);
//! if session.activate().await == ActivationOutcome::Active {
//!     if let Some(result) = session.process_batch(&detections) {
//!         println!("{}", result.value);
//!     }
//! }
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod decode;
pub mod errors;
pub mod flash;
pub mod scanner;

// Re-export commonly used types
pub use backends::ScanBackends;
pub use config::ScanConfig;
pub use errors::{ScanError, ScanResult};
pub use scanner::{
    ActivationOutcome, CaptureResult, CodeKind, RawDetection, ScanPayload, ScanSession,
    SessionEvent,
};
