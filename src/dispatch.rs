//! Message dispatch.
//!
//! Validates a send request, checks session readiness, normalizes the
//! destination and forwards to the driver. Each step is a hard precondition
//! with a typed error; there is no retry and no local record of sent
//! messages.

use serde::Deserialize;
use thiserror::Error;

use crate::driver::{Receipt, SessionDriver};
use crate::session::SessionTracker;

/// Address suffix for direct (non-group) chats.
pub const DIRECT_CHAT_SUFFIX: &str = "@c.us";

/// Body of `POST /send-message`. Missing fields deserialize to `None` and
/// fail validation rather than the JSON extractor.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Destination or body missing/empty.
    #[error("destination and message are required")]
    InvalidRequest,

    /// Session is not authenticated and connected.
    #[error("session is not ready")]
    SessionNotReady,

    /// The driver rejected or errored the send.
    #[error("{0}")]
    Failed(String),
}

/// Append the direct-chat suffix unless the destination already carries one.
pub fn normalize_destination(number: &str) -> String {
    if number.ends_with(DIRECT_CHAT_SUFFIX) {
        number.to_string()
    } else {
        format!("{number}{DIRECT_CHAT_SUFFIX}")
    }
}

/// Forward a validated send to the driver.
///
/// Validation precedes the readiness check. The tracker snapshot is taken
/// before the await on the driver, so no lock is held across the send.
pub async fn dispatch(
    tracker: &SessionTracker,
    driver: &dyn SessionDriver,
    request: &SendRequest,
) -> Result<Receipt, DispatchError> {
    let number = request.number.as_deref().unwrap_or_default();
    let message = request.message.as_deref().unwrap_or_default();
    if number.is_empty() || message.is_empty() {
        return Err(DispatchError::InvalidRequest);
    }

    if !tracker.is_ready() {
        return Err(DispatchError::SessionNotReady);
    }

    let destination = normalize_destination(number);
    driver
        .send_message(&destination, message)
        .await
        .map_err(|e| DispatchError::Failed(e.to_string()))
}
