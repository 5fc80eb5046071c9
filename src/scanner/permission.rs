// SPDX-License-Identifier: GPL-3.0-only

//! Camera permission gate
//!
//! Mediates permission acquisition for one scan session:
//!
//! ```text
//! NotDetermined ──request──▶ Requesting ──┬─▶ Granted
//!                                         ├─▶ Denied
//!                                         └─▶ Blocked
//! (no camera at all) ─────────────────────────▶ Unavailable (terminal)
//! ```
//!
//! Concurrent callers share one in-flight resolution, so a single platform
//! prompt is shown however many times [`PermissionGate::ensure_permission`]
//! is awaited. Platform errors never escape: they resolve to `Denied`
//! carrying the error message.

use super::types::{PermissionState, PlatformStatus};
use crate::backends::PermissionProvider;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Result of one permission resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionOutcome {
    pub state: PermissionState,
    /// Message of the platform error that forced `Denied`, if any
    pub error: Option<String>,
}

impl PermissionOutcome {
    fn new(state: PermissionState) -> Self {
        Self { state, error: None }
    }

    fn failed(message: String) -> Self {
        Self {
            state: PermissionState::Denied,
            error: Some(message),
        }
    }

    pub fn is_granted(&self) -> bool {
        self.state == PermissionState::Granted
    }
}

type InFlight = Shared<BoxFuture<'static, PermissionOutcome>>;

struct GateInner {
    state: PermissionState,
    last_error: Option<String>,
    /// Platform status observed by the last resolution
    last_platform: Option<PlatformStatus>,
    in_flight: Option<InFlight>,
}

#[derive(Clone)]
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    inner: Arc<Mutex<GateInner>>,
    state_tx: Arc<watch::Sender<PermissionState>>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        let (state_tx, _) = watch::channel(PermissionState::NotDetermined);
        Self {
            provider,
            inner: Arc::new(Mutex::new(GateInner {
                state: PermissionState::NotDetermined,
                last_error: None,
                last_platform: None,
                in_flight: None,
            })),
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn provider(&self) -> Arc<dyn PermissionProvider> {
        Arc::clone(&self.provider)
    }

    pub fn state(&self) -> PermissionState {
        lock(&self.inner).state
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner).last_error.clone()
    }

    /// Watch state transitions, including `Requesting`
    pub fn subscribe(&self) -> watch::Receiver<PermissionState> {
        self.state_tx.subscribe()
    }

    /// Resolve the camera permission
    ///
    /// Joins the in-flight resolution if there is one. `Denied` and
    /// `Blocked` are not retried on their own: a new prompt is only shown
    /// when the platform now reports a different status than last time.
    pub async fn ensure_permission(&self) -> PermissionOutcome {
        let pending = {
            let mut inner = lock(&self.inner);
            if inner.state == PermissionState::Unavailable {
                return PermissionOutcome::new(PermissionState::Unavailable);
            }
            if let Some(in_flight) = inner.in_flight.clone() {
                debug!("Joining in-flight permission request");
                in_flight
            } else {
                let resolution = self.resolve().boxed().shared();
                inner.in_flight = Some(resolution.clone());
                resolution
            }
        };

        pending.await
    }

    fn resolve(&self) -> impl Future<Output = PermissionOutcome> + Send + 'static {
        let provider = Arc::clone(&self.provider);
        let inner = Arc::clone(&self.inner);
        let state_tx = Arc::clone(&self.state_tx);

        async move {
            let outcome = run_protocol(provider.as_ref(), &inner, &state_tx).await;

            {
                let mut guard = lock(&inner);
                guard.state = outcome.state;
                guard.last_error = outcome.error.clone();
                guard.in_flight = None;
            }
            state_tx.send_replace(outcome.state);

            match &outcome.error {
                Some(error) => warn!(%error, "Camera permission request failed"),
                None => info!(state = %outcome.state, "Camera permission resolved"),
            }
            outcome
        }
    }
}

async fn run_protocol(
    provider: &dyn PermissionProvider,
    inner: &Mutex<GateInner>,
    state_tx: &watch::Sender<PermissionState>,
) -> PermissionOutcome {
    let (previous, last_platform) = {
        let guard = lock(inner);
        (guard.state, guard.last_platform)
    };

    let status = match provider.check().await {
        Ok(status) => status,
        Err(e) => return PermissionOutcome::failed(e.to_string()),
    };
    lock(inner).last_platform = Some(status);
    debug!(?status, %previous, "Platform permission status");

    match status {
        PlatformStatus::Granted => PermissionOutcome::new(PermissionState::Granted),
        PlatformStatus::Unavailable => PermissionOutcome::new(PermissionState::Unavailable),
        PlatformStatus::Blocked => PermissionOutcome::new(PermissionState::Blocked),
        PlatformStatus::Denied
            if previous.needs_settings() && last_platform == Some(PlatformStatus::Denied) =>
        {
            debug!("Permission still denied, not prompting again");
            PermissionOutcome::new(PermissionState::Denied)
        }
        PlatformStatus::NotDetermined | PlatformStatus::Denied => {
            lock(inner).state = PermissionState::Requesting;
            state_tx.send_replace(PermissionState::Requesting);
            info!("Prompting for camera permission");

            let answer = provider.request().await;
            match answer {
                Ok(answer) => {
                    lock(inner).last_platform = Some(answer);
                    let state = match answer {
                        // A dismissed prompt counts as a refusal
                        PlatformStatus::NotDetermined => PermissionState::Denied,
                        other => other.into(),
                    };
                    PermissionOutcome::new(state)
                }
                Err(e) => PermissionOutcome::failed(e.to_string()),
            }
        }
    }
}

fn lock(inner: &Mutex<GateInner>) -> MutexGuard<'_, GateInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
