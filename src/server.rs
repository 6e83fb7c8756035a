//! Router assembly and shared state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::driver::SessionDriver;
use crate::handlers;
use crate::ratelimit::{Class, Decision, RateLimiter};
use crate::response;
use crate::session::SessionTracker;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub tracker: SessionTracker,
    pub limiter: Arc<RateLimiter>,
    pub driver: Arc<dyn SessionDriver>,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/status", get(handlers::status))
        .route("/send-message", post(handlers::send_message))
        .layer(middleware::from_fn_with_state(state.clone(), admit_general))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// General-class admission, applied to every route. Sends are additionally
/// charged against the `Send` class in their handler.
async fn admit_general(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    match state.limiter.check(&addr.ip().to_string(), Class::General) {
        Decision::Allow => next.run(request).await,
        Decision::Reject { .. } => response::too_many_requests(response::GENERAL_THROTTLED),
    }
}
