// SPDX-License-Identifier: GPL-3.0-only

//! Camera permission providers
//!
//! - [`DevicePresencePermissions`]: desktop Linux, where there is no
//!   permission prompt; access is implied by the presence of a V4L2 node.
//! - [`ScriptedPermissions`]: a scriptable provider for simulations and
//!   tests, modelling the prompt-based mobile flow.

use super::PermissionProvider;
use crate::errors::PermissionError;
use crate::scanner::types::PlatformStatus;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Desktop provider: granted when a `video*` node exists under `/dev`
#[derive(Debug, Clone)]
pub struct DevicePresencePermissions {
    dev_dir: PathBuf,
}

impl Default for DevicePresencePermissions {
    fn default() -> Self {
        Self::new("/dev")
    }
}

impl DevicePresencePermissions {
    pub fn new(dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
        }
    }

    async fn probe(dev_dir: &Path) -> Result<PlatformStatus, PermissionError> {
        let mut entries = tokio::fs::read_dir(dev_dir)
            .await
            .map_err(|e| PermissionError::Platform(format!("{}: {}", dev_dir.display(), e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PermissionError::Platform(e.to_string()))?
        {
            if entry.file_name().to_string_lossy().starts_with("video") {
                debug!(node = %entry.path().display(), "Found video device node");
                return Ok(PlatformStatus::Granted);
            }
        }

        info!(dir = %dev_dir.display(), "No video device nodes found");
        Ok(PlatformStatus::Unavailable)
    }
}

impl PermissionProvider for DevicePresencePermissions {
    fn check(&self) -> BoxFuture<'_, Result<PlatformStatus, PermissionError>> {
        Self::probe(&self.dev_dir).boxed()
    }

    fn request(&self) -> BoxFuture<'_, Result<PlatformStatus, PermissionError>> {
        // Nothing to prompt for on desktop
        Self::probe(&self.dev_dir).boxed()
    }
}

/// Scriptable prompt-based provider
///
/// `check` reports the current platform status; `request` waits for the
/// configured prompt delay, then answers with the scripted outcome and
/// adopts it as the new platform status.
#[derive(Debug)]
pub struct ScriptedPermissions {
    status: Mutex<PlatformStatus>,
    answer: Mutex<Result<PlatformStatus, String>>,
    check_error: Mutex<Option<String>>,
    prompt_delay: Duration,
    prompts: AtomicUsize,
    checks: AtomicUsize,
}

impl ScriptedPermissions {
    /// Provider that reports `status` and grants when prompted
    pub fn new(status: PlatformStatus) -> Self {
        Self {
            status: Mutex::new(status),
            answer: Mutex::new(Ok(PlatformStatus::Granted)),
            check_error: Mutex::new(None),
            prompt_delay: Duration::ZERO,
            prompts: AtomicUsize::new(0),
            checks: AtomicUsize::new(0),
        }
    }

    /// What the user answers when prompted
    pub fn answering(self, answer: PlatformStatus) -> Self {
        *lock(&self.answer) = Ok(answer);
        self
    }

    /// Make the prompt itself fail
    pub fn failing_prompt(self, message: impl Into<String>) -> Self {
        *lock(&self.answer) = Err(message.into());
        self
    }

    /// Make status checks fail
    pub fn failing_check(self, message: impl Into<String>) -> Self {
        *lock(&self.check_error) = Some(message.into());
        self
    }

    /// How long the prompt stays open
    pub fn with_prompt_delay(mut self, delay: Duration) -> Self {
        self.prompt_delay = delay;
        self
    }

    /// Simulate the user changing the permission in system settings
    pub fn set_status(&self, status: PlatformStatus) {
        *lock(&self.status) = status;
    }

    /// Change the answer for future prompts
    pub fn set_answer(&self, answer: PlatformStatus) {
        *lock(&self.answer) = Ok(answer);
    }

    pub fn status(&self) -> PlatformStatus {
        *lock(&self.status)
    }

    /// Number of prompts shown so far
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl PermissionProvider for ScriptedPermissions {
    fn check(&self) -> BoxFuture<'_, Result<PlatformStatus, PermissionError>> {
        async move {
            self.checks.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = lock(&self.check_error).clone() {
                return Err(PermissionError::Platform(message));
            }
            Ok(self.status())
        }
        .boxed()
    }

    fn request(&self) -> BoxFuture<'_, Result<PlatformStatus, PermissionError>> {
        async move {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            if !self.prompt_delay.is_zero() {
                tokio::time::sleep(self.prompt_delay).await;
            }

            let answer = lock(&self.answer).clone();
            match answer {
                Ok(status) => {
                    self.set_status(status);
                    Ok(status)
                }
                Err(message) => Err(PermissionError::Platform(message)),
            }
        }
        .boxed()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
