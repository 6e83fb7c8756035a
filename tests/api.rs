//! Gateway API integration tests.
//!
//! Exercise the full router with a fake session driver: admission control,
//! readiness gating, validation and the response envelopes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use wagate::driver::{DriverError, DriverEvent, Receipt, SessionDriver};
use wagate::ratelimit::RateLimiter;
use wagate::server::{AppState, build_app};
use wagate::session::SessionTracker;

// ============================================================================
// Harness
// ============================================================================

struct FakeDriver {
    fail_with: Option<String>,
}

#[async_trait]
impl SessionDriver for FakeDriver {
    async fn initialize(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn send_message(&self, destination: &str, _body: &str) -> Result<Receipt, DriverError> {
        if let Some(reason) = &self.fail_with {
            return Err(DriverError::Rejected(reason.clone()));
        }
        Ok(Receipt {
            id: "m1".to_string(),
            to: destination.to_string(),
            timestamp: 1_700_000_000,
        })
    }
}

struct Harness {
    app: Router,
    tracker: SessionTracker,
}

fn harness(limiter: RateLimiter, fail_with: Option<&str>) -> Harness {
    let tracker = SessionTracker::new();
    let state = AppState {
        tracker: tracker.clone(),
        limiter: Arc::new(limiter),
        driver: Arc::new(FakeDriver {
            fail_with: fail_with.map(str::to_string),
        }),
    };
    Harness {
        app: build_app(state),
        tracker,
    }
}

fn client(ip: &str) -> ConnectInfo<SocketAddr> {
    ConnectInfo(format!("{ip}:40000").parse().unwrap())
}

fn get(path: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .extension(client(ip))
        .body(Body::empty())
        .unwrap()
}

fn post_json(path: &str, ip: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .extension(client(ip))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn send_body() -> Value {
    json!({"number": "6281234567890", "message": "hi"})
}

// ============================================================================
// Status
// ============================================================================

#[tokio::test]
async fn status_flips_ready_exactly_at_ready_event() {
    let h = harness(RateLimiter::new(), None);

    let response = h.app.clone().oneshot(get("/status", "10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["isReady"], false);
    assert_eq!(body["phase"], "initializing");

    h.tracker.apply(DriverEvent::Ready);

    let body = body_json(
        h.app.clone().oneshot(get("/status", "10.0.0.1")).await.unwrap(),
    )
    .await;
    assert_eq!(body["isReady"], true);
    assert_eq!(body["phase"], "ready");
    assert_eq!(body["lastError"], Value::Null);
}

#[tokio::test]
async fn status_reports_last_error_after_disconnect() {
    let h = harness(RateLimiter::new(), None);
    h.tracker.apply(DriverEvent::Ready);
    h.tracker
        .apply(DriverEvent::Disconnected("NAVIGATION".to_string()));

    let body = body_json(h.app.oneshot(get("/status", "10.0.0.1")).await.unwrap()).await;
    assert_eq!(body["isReady"], false);
    assert_eq!(body["phase"], "disconnected");
    assert_eq!(body["lastError"], "NAVIGATION");
}

// ============================================================================
// Status page
// ============================================================================

#[tokio::test]
async fn index_embeds_qr_while_awaiting_scan() {
    let h = harness(RateLimiter::new(), None);
    h.tracker.apply(DriverEvent::Qr("2@challenge".to_string()));

    let response = h.app.oneshot(get("/", "10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("WhatsApp Gateway Status"));
    assert!(page.contains("data:image/svg+xml;base64,"));
}

#[tokio::test]
async fn index_drops_qr_once_ready() {
    let h = harness(RateLimiter::new(), None);
    h.tracker.apply(DriverEvent::Qr("2@challenge".to_string()));
    h.tracker.apply(DriverEvent::Ready);

    let response = h.app.oneshot(get("/", "10.0.0.1")).await.unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!page.contains("data:image/svg+xml;base64,"));
    assert!(page.contains("Connected and ready"));
}

// ============================================================================
// Send message
// ============================================================================

#[tokio::test]
async fn send_succeeds_when_ready() {
    let h = harness(RateLimiter::new(), None);
    h.tracker.apply(DriverEvent::Ready);

    let response = h
        .app
        .oneshot(post_json("/send-message", "10.0.0.1", send_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Pesan terkirim");
    assert_eq!(body["data"]["to"], "6281234567890@c.us");
    assert_eq!(body["data"]["id"], "m1");
}

#[tokio::test]
async fn send_rejected_while_awaiting_scan() {
    let h = harness(RateLimiter::new(), None);
    h.tracker.apply(DriverEvent::Qr("2@challenge".to_string()));

    let response = h
        .app
        .oneshot(post_json("/send-message", "10.0.0.1", send_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(
        body["message"],
        "WhatsApp client belum siap. Silakan scan QR Code terlebih dahulu."
    );
}

#[tokio::test]
async fn send_with_missing_fields_is_bad_request() {
    let h = harness(RateLimiter::new(), None);
    h.tracker.apply(DriverEvent::Ready);

    for body in [
        json!({"number": "628"}),
        json!({"message": "hi"}),
        json!({"number": "", "message": "hi"}),
        json!({}),
    ] {
        let response = h
            .app
            .clone()
            .oneshot(post_json("/send-message", "10.0.0.1", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Nomor dan pesan harus diisi");
    }
}

#[tokio::test]
async fn validation_errors_win_over_readiness() {
    let h = harness(RateLimiter::new(), None);
    // Session still initializing, fields also missing: 400, not 503.
    let response = h
        .app
        .oneshot(post_json("/send-message", "10.0.0.1", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn driver_failure_maps_to_internal_error() {
    let h = harness(RateLimiter::new(), Some("number not registered"));
    h.tracker.apply(DriverEvent::Ready);

    let response = h
        .app
        .oneshot(post_json("/send-message", "10.0.0.1", send_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("number not registered"));
}

// ============================================================================
// Admission
// ============================================================================

#[tokio::test]
async fn sixty_first_general_request_is_throttled() {
    let h = harness(RateLimiter::new(), None);

    for _ in 0..60 {
        let response = h.app.clone().oneshot(get("/status", "10.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = h.app.clone().oneshot(get("/status", "10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Terlalu banyak request. Silakan coba lagi nanti.");

    // A different client is unaffected.
    let response = h.app.oneshot(get("/status", "10.0.0.2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn general_window_resets_after_expiry() {
    let h = harness(
        RateLimiter::with_config(Duration::from_millis(30), 1, 1),
        None,
    );

    let response = h.app.clone().oneshot(get("/status", "10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = h.app.clone().oneshot(get("/status", "10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(Duration::from_millis(40)).await;

    let response = h.app.oneshot(get("/status", "10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn send_budget_is_charged_on_top_of_general() {
    // Plenty of general headroom, two sends allowed.
    let h = harness(
        RateLimiter::with_config(Duration::from_secs(60), 100, 2),
        None,
    );
    h.tracker.apply(DriverEvent::Ready);

    for _ in 0..2 {
        let response = h
            .app
            .clone()
            .oneshot(post_json("/send-message", "10.0.0.1", send_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = h
        .app
        .clone()
        .oneshot(post_json("/send-message", "10.0.0.1", send_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "Terlalu banyak request pengiriman pesan. Silakan coba lagi nanti."
    );

    // Non-send routes still admitted for the same client.
    let response = h.app.oneshot(get("/status", "10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
