//! Shared-secret bearer auth for the inbound webhook: the source
//! system exposed delivery-failure ingest with no authentication at all.
//! Grounded in the `axum::middleware::from_fn_with_state` guard shape used
//! ahead of a route in `prospectorengine-prospector-btc`'s orchestrator,
//! scaled down to a single shared-secret comparison rather than dual
//! JWT/worker-token support.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct Unauthorized {
    error: &'static str,
    message: &'static str,
}

fn reject() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(Unauthorized {
            error: "unauthorized",
            message: "missing or invalid bearer token",
        }),
    )
        .into_response()
}

/// Requires `Authorization: Bearer <secret>` to match
/// `AppState::webhook_shared_secret` exactly. A `None` secret disables the
/// check entirely, so this middleware is only wired onto the webhook route
/// (`router::build_router`), never globally.
pub async fn require_webhook_secret(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.webhook_shared_secret.as_deref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => next.run(request).await,
        _ => reject(),
    }
}
