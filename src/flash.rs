// SPDX-License-Identifier: GPL-3.0-only

//! Torch control via Linux sysfs LEDs
//!
//! The scan screen's flash button is a plain on/off pass-through. On Linux
//! phones the camera flash is exposed at `/sys/class/leds/*:flash`; torch
//! mode is driven through the `brightness` file, which is group-writable
//! by `feedbackd`.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default sysfs LED class directory
pub const SYSFS_LEDS_DIR: &str = "/sys/class/leds";

/// A writable flash LED
#[derive(Debug, Clone)]
pub struct TorchLed {
    /// e.g. `/sys/class/leds/white:flash`
    path: PathBuf,
    max_brightness: u32,
    name: String,
}

impl TorchLed {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full brightness when on, 0 when off
    pub fn set_enabled(&self, enabled: bool) -> io::Result<()> {
        let value = if enabled { self.max_brightness } else { 0 };
        std::fs::write(self.path.join("brightness"), value.to_string())
    }
}

/// All controllable flash LEDs of the device
#[derive(Debug, Clone, Default)]
pub struct TorchLeds {
    leds: Vec<TorchLed>,
}

impl TorchLeds {
    pub fn discover() -> Self {
        Self::discover_in(Path::new(SYSFS_LEDS_DIR))
    }

    /// Scan `leds_dir` for `*:flash` entries we can write to
    pub fn discover_in(leds_dir: &Path) -> Self {
        let Ok(entries) = std::fs::read_dir(leds_dir) else {
            warn!(dir = %leds_dir.display(), "Cannot read LED directory, torch disabled");
            return Self::default();
        };

        let mut leds = Vec::new();
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !name.ends_with(":flash") {
                continue;
            }

            let path = entry.path();
            let max_brightness = match std::fs::read_to_string(path.join("max_brightness")) {
                Ok(s) => match s.trim().parse::<u32>() {
                    Ok(v) if v > 0 => v,
                    _ => {
                        warn!(name, "Invalid max_brightness value");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(name, error = %e, "Cannot read max_brightness");
                    continue;
                }
            };

            if let Err(e) = std::fs::OpenOptions::new()
                .write(true)
                .open(path.join("brightness"))
            {
                warn!(name, error = %e, "Flash LED found but not writable");
                continue;
            }

            info!(name, max_brightness, "Discovered flash LED");
            leds.push(TorchLed {
                path,
                max_brightness,
                name: name.to_string(),
            });
        }

        leds.sort_by(|a, b| a.name.cmp(&b.name));
        Self { leds }
    }

    pub fn is_empty(&self) -> bool {
        self.leds.is_empty()
    }

    pub fn leds(&self) -> &[TorchLed] {
        &self.leds
    }

    /// Switch every LED; stops at the first write error
    pub fn set_enabled(&self, enabled: bool) -> io::Result<()> {
        for led in &self.leds {
            led.set_enabled(enabled)?;
        }
        debug!(enabled, count = self.leds.len(), "Torch switched");
        Ok(())
    }
}
