//! Session driver boundary.
//!
//! The authenticated WhatsApp connection lives outside this process. The
//! gateway talks to it through two narrow seams: the [`SessionDriver`] trait
//! for outbound calls, and a stream of [`DriverEvent`]s the driver pushes as
//! its lifecycle advances. The tracker consumes the events; nothing else in
//! the gateway touches the driver directly except the dispatcher's send.

pub mod subprocess;

pub use subprocess::SubprocessDriver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle and traffic events emitted by the session driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// A fresh QR authentication challenge. The raw string is what the
    /// phone app scans; rendering it to an image is the tracker's problem.
    Qr(String),
    /// Session authenticated and connected.
    Ready,
    /// Session lost; terminal until an external restart.
    Disconnected(String),
    /// Authentication rejected by the network.
    AuthFailure(String),
    /// Driver-level error that does not necessarily end the session.
    Error(String),
    /// Inbound message. Logged only, the gateway does not process traffic
    /// in this direction.
    Message { from: String, body: String },
}

/// Proof of a completed send, as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Driver-assigned message id.
    pub id: String,
    /// Normalized destination the message went to.
    pub to: String,
    /// Unix timestamp of the send, seconds.
    pub timestamp: i64,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver is not running")]
    NotRunning,

    #[error("driver i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("driver rejected the command: {0}")]
    Rejected(String),

    #[error("driver protocol violation: {0}")]
    Protocol(String),
}

/// Outbound capability of the session driver.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// Start the underlying session. Called once at gateway startup.
    async fn initialize(&self) -> Result<(), DriverError>;

    /// Send `body` to `destination` (already normalized by the dispatcher).
    async fn send_message(&self, destination: &str, body: &str) -> Result<Receipt, DriverError>;
}
