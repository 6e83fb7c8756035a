//! Message send endpoint.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use tracing::error;

use crate::dispatch::{self, DispatchError, SendRequest};
use crate::ratelimit::{Class, Decision};
use crate::response;
use crate::server::AppState;

/// POST /send-message
///
/// Charged against the `Send` admission class on top of the general class
/// already applied by the router middleware.
pub async fn send_message(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<SendRequest>,
) -> Response {
    let key = addr.ip().to_string();
    if let Decision::Reject { .. } = state.limiter.check(&key, Class::Send) {
        return response::too_many_requests(response::SEND_THROTTLED);
    }

    match dispatch::dispatch(&state.tracker, state.driver.as_ref(), &request).await {
        Ok(receipt) => response::success(response::MESSAGE_SENT, receipt),
        Err(DispatchError::InvalidRequest) => response::bad_request(response::MISSING_FIELDS),
        Err(DispatchError::SessionNotReady) => {
            response::service_unavailable(response::NOT_READY)
        }
        Err(DispatchError::Failed(detail)) => {
            error!(error = %detail, "Failed to send message");
            response::internal_error(detail)
        }
    }
}
