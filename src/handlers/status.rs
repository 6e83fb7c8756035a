//! Connection status endpoint.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::server::AppState;
use crate::session::Phase;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    status: &'static str,
    message: &'static str,
    is_ready: bool,
    phase: Phase,
    connection_status: &'static str,
    last_error: Option<String>,
}

/// GET /status
///
/// Read-only projection of the tracker snapshot.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let session = state.tracker.current();

    Json(StatusResponse {
        status: "success",
        message: "WhatsApp Gateway is running",
        is_ready: session.is_ready(),
        phase: session.phase,
        connection_status: session.narrative,
        last_error: session.last_error,
    })
}
