//! JSON response envelopes shared by all handlers.
//!
//! Every body is `{status: "success" | "error", message, ...}`. The
//! user-facing strings are part of the wire contract with existing
//! clients and must not be reworded.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Throttling notice for the general limiter.
pub const GENERAL_THROTTLED: &str = "Terlalu banyak request. Silakan coba lagi nanti.";
/// Throttling notice for the send limiter.
pub const SEND_THROTTLED: &str =
    "Terlalu banyak request pengiriman pesan. Silakan coba lagi nanti.";
/// Missing destination or body.
pub const MISSING_FIELDS: &str = "Nomor dan pesan harus diisi";
/// Session not authenticated yet.
pub const NOT_READY: &str = "WhatsApp client belum siap. Silakan scan QR Code terlebih dahulu.";
/// Send succeeded.
pub const MESSAGE_SENT: &str = "Pesan terkirim";

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

/// `{status: "error", message}` with the given HTTP status.
pub fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            status: "error",
            message: message.into(),
        }),
    )
        .into_response()
}

pub fn bad_request(message: impl Into<String>) -> Response {
    error(StatusCode::BAD_REQUEST, message)
}

pub fn too_many_requests(message: impl Into<String>) -> Response {
    error(StatusCode::TOO_MANY_REQUESTS, message)
}

pub fn service_unavailable(message: impl Into<String>) -> Response {
    error(StatusCode::SERVICE_UNAVAILABLE, message)
}

pub fn internal_error(message: impl Into<String>) -> Response {
    error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

#[derive(Serialize)]
struct SuccessBody<T: Serialize> {
    status: &'static str,
    message: String,
    data: T,
}

/// `{status: "success", message, data}` with HTTP 200.
pub fn success(message: impl Into<String>, data: impl Serialize) -> Response {
    (
        StatusCode::OK,
        Json(SuccessBody {
            status: "success",
            message: message.into(),
            data,
        }),
    )
        .into_response()
}
