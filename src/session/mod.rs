//! Session lifecycle tracking.
//!
//! The tracker owns the single session's state for the life of the process.
//! It is a reducer over driver events: HTTP handlers only read snapshots,
//! every mutation comes from the driver event loop (plus the one startup
//! hook for a failed `initialize`). Out-of-order driver events are applied
//! last-write-wins, so a `qr` after `ready` still moves the session back to
//! awaiting a scan.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::driver::DriverEvent;
use crate::qr;

/// Discrete lifecycle state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initializing,
    AwaitingScan,
    Ready,
    Disconnected,
    AuthFailed,
    Errored,
}

fn narrative_for(phase: Phase) -> &'static str {
    match phase {
        Phase::Initializing => "Initializing WhatsApp session",
        Phase::AwaitingScan => "Waiting for QR code scan",
        Phase::Ready => "Connected and ready",
        Phase::Disconnected => "Disconnected from WhatsApp",
        Phase::AuthFailed => "Authentication failed",
        Phase::Errored => "Session error",
    }
}

/// Point-in-time snapshot of the session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: Phase,
    /// Rendered QR data URL, present only while `AwaitingScan`.
    pub qr_image: Option<String>,
    /// Last failure reason. Sticky: kept for diagnostics until the next
    /// failure overwrites it, not cleared on recovery.
    pub last_error: Option<String>,
    /// Human-readable description, recomputed on every phase transition.
    pub narrative: &'static str,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: Phase::Initializing,
            qr_image: None,
            last_error: None,
            narrative: narrative_for(Phase::Initializing),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }
}

/// Shared handle to the session state.
///
/// Readers always observe a complete record: every mutation happens under
/// the write lock, and the lock is never held across an await.
#[derive(Clone)]
pub struct SessionTracker {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState::new())),
        }
    }

    /// Read-only copy of the current state.
    pub fn current(&self) -> SessionState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_ready(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_ready()
    }

    fn mutate(&self, f: impl FnOnce(&mut SessionState)) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }

    fn transition(&self, phase: Phase, f: impl FnOnce(&mut SessionState)) {
        self.mutate(|state| {
            state.phase = phase;
            state.narrative = narrative_for(phase);
            f(state);
        });
    }

    /// Apply one driver event.
    pub fn apply(&self, event: DriverEvent) {
        match event {
            DriverEvent::Qr(raw) => {
                info!("QR challenge received");
                match qr::render_data_url(&raw) {
                    Ok(image) => {
                        self.transition(Phase::AwaitingScan, |state| {
                            state.qr_image = Some(image);
                        });
                        info!("QR code rendered");
                    }
                    Err(e) => {
                        // Non-fatal: keep the prior phase, the next qr event
                        // gets a fresh attempt.
                        warn!(error = %e, "Failed to render QR code");
                        self.mutate(|state| {
                            state.last_error = Some(format!("QR render failed: {e}"));
                        });
                    }
                }
            }
            DriverEvent::Ready => {
                info!("Session is ready");
                self.transition(Phase::Ready, |state| {
                    state.qr_image = None;
                });
            }
            DriverEvent::Disconnected(reason) => {
                warn!(reason = %reason, "Session disconnected");
                self.transition(Phase::Disconnected, |state| {
                    state.qr_image = None;
                    state.last_error = Some(reason);
                });
            }
            DriverEvent::AuthFailure(reason) => {
                warn!(reason = %reason, "Authentication failure");
                self.transition(Phase::AuthFailed, |state| {
                    state.qr_image = None;
                    state.last_error = Some(reason);
                });
            }
            DriverEvent::Error(reason) => {
                // A transient driver error does not invalidate readiness.
                warn!(reason = %reason, "Session driver error");
                self.mutate(|state| {
                    state.last_error = Some(reason);
                });
            }
            DriverEvent::Message { from, body } => {
                info!(from = %from, body = %body, "Incoming message");
            }
        }
    }

    /// Record a failed driver `initialize` at startup. The process stays up
    /// so operators can inspect `/status`.
    pub fn fail_init(&self, reason: &str) {
        self.transition(Phase::Errored, |state| {
            state.last_error = Some(reason.to_string());
        });
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Consume driver events until the channel closes.
pub fn spawn_event_loop(
    tracker: SessionTracker,
    mut events: mpsc::UnboundedReceiver<DriverEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracker.apply(event);
        }
    })
}
