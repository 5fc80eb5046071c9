// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scan loop
//!
//! Platform failures are mostly folded into state values before they reach
//! the session (see [`crate::scanner::permission`]); these types cover the
//! collaborator boundaries and configuration.

use std::fmt;

/// Result type alias using ScanError
pub type ScanResult<T> = Result<T, ScanError>;

/// Main error type
#[derive(Debug, Clone)]
pub enum ScanError {
    /// Camera device failure
    Device(DeviceError),
    /// Image picker failure
    Picker(PickerError),
    /// Picked image could not be decoded
    Decode(String),
    /// Configuration errors
    Config(ConfigError),
    /// Operation not allowed in the current activation state
    InvalidState(String),
}

/// Errors raised by a platform permission primitive
#[derive(Debug, Clone)]
pub enum PermissionError {
    /// The platform call itself failed
    Platform(String),
}

/// Camera device errors
#[derive(Debug, Clone)]
pub enum DeviceError {
    /// No camera devices found
    NotFound,
    /// Backend error
    Backend(String),
}

/// Image picker errors
#[derive(Debug, Clone)]
pub enum PickerError {
    /// Picked image could not be read
    Read(String),
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Config file could not be read
    Io(String),
    /// Config file is not valid JSON for [`crate::config::ScanConfig`]
    Parse(String),
    /// A value is outside its allowed range
    Invalid(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Device(e) => write!(f, "Device error: {}", e),
            ScanError::Picker(e) => write!(f, "Picker error: {}", e),
            ScanError::Decode(msg) => write!(f, "Decode error: {}", msg),
            ScanError::Config(e) => write!(f, "Configuration error: {}", e),
            ScanError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionError::Platform(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotFound => write!(f, "No camera devices found"),
            DeviceError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for PickerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickerError::Read(msg) => write!(f, "Failed to read image: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Failed to read config: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {}
impl std::error::Error for PermissionError {}
impl std::error::Error for DeviceError {}
impl std::error::Error for PickerError {}
impl std::error::Error for ConfigError {}

impl From<DeviceError> for ScanError {
    fn from(err: DeviceError) -> Self {
        ScanError::Device(err)
    }
}

impl From<PickerError> for ScanError {
    fn from(err: PickerError) -> Self {
        ScanError::Picker(err)
    }
}

impl From<ConfigError> for ScanError {
    fn from(err: ConfigError) -> Self {
        ScanError::Config(err)
    }
}

// Conversions for I/O errors
impl From<std::io::Error> for PickerError {
    fn from(err: std::io::Error) -> Self {
        PickerError::Read(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}
