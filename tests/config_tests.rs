// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use codescan::ScanConfig;
use codescan::constants;
use codescan::errors::ConfigError;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = ScanConfig::default();

    assert_eq!(config.zoom.min_zoom, constants::MIN_ZOOM);
    assert_eq!(config.zoom.fallback_max_zoom, constants::FALLBACK_MAX_ZOOM);
    assert_eq!(config.dedup_window(), constants::DEDUP_WINDOW);
    assert_eq!(config.device_timeout(), constants::DEVICE_TIMEOUT);
    assert!(config.validate().is_ok(), "Default config must validate");
}

#[test]
fn test_config_partial_json_uses_defaults() {
    let config = ScanConfig::from_json(r#"{ "dedup_window_ms": 500, "zoom": { "zoom_in_step": 0.25 } }"#)
        .unwrap();

    assert_eq!(config.dedup_window(), Duration::from_millis(500));
    assert_eq!(config.zoom.zoom_in_step, 0.25);
    assert_eq!(config.zoom.zoom_out_step, constants::ZOOM_OUT_STEP);
    assert_eq!(config.detection.min_box_side, constants::MIN_BOX_SIDE);
}

#[test]
fn test_config_json_round_trip() {
    let config = ScanConfig::default();
    let json = config.to_json().unwrap();
    assert_eq!(ScanConfig::from_json(&json).unwrap(), config);
}

#[test]
fn test_config_rejects_overlapping_bands() {
    let result = ScanConfig::from_json(
        r#"{ "zoom": { "zoom_in_upper_ratio": 0.2, "zoom_out_ratio": 0.1 } }"#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_config_rejects_zero_tick_interval() {
    let result = ScanConfig::from_json(r#"{ "zoom": { "tick_interval_ms": 0 } }"#);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_config_rejects_malformed_json() {
    let result = ScanConfig::from_json("{ not json");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_config_load_missing_file() {
    let result = ScanConfig::load(std::path::Path::new("/nonexistent/codescan.json"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
