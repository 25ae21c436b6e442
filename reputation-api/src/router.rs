//! Route table assembly: `Router::new().route(...).with_state(...)` across
//! the four route groups — webhook ingest, reputation query/action,
//! reservation management, and the testing harness.

use std::{sync::Arc, time::Duration};

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use crate::{auth, reputation, reservation, state::AppState, testing, webhook};

#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    let webhook_route = Router::new()
        .route("/webhook/delivery-failure", post(webhook::ingest_delivery_failures))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_webhook_secret,
        ));

    Router::new()
        .merge(webhook_route)
        .route("/ips/{ip}/reputation", get(reputation::get_reputation))
        .route("/ips/{ip}/failures", get(reputation::list_failures))
        .route("/dashboard/ip-health", get(reputation::dashboard_ip_health))
        .route("/ips/{ip}/quarantine", post(reputation::quarantine_ip))
        .route("/ips/{ip}/dnsbl-check", post(reputation::dnsbl_check))
        .route("/ips/reserve", post(reservation::reserve_ips))
        .route("/ips/reserved", get(reservation::list_reserved))
        .route("/ips/reserved/{id}", get(reservation::get_reserved))
        .route("/ips/reserved/{id}", delete(reservation::delete_reserved))
        .route(
            "/ips/reserved/{id}/status",
            put(reservation::update_reserved_status),
        )
        .route(
            "/ips/reserved/{id}/recheck",
            post(reservation::recheck_reserved),
        )
        .route("/ips/quota", get(reservation::get_quota))
        .route("/ips/cleanup", post(reservation::run_cleanup))
        .route("/ips/statistics", get(reservation::get_statistics))
        .route(
            "/testing/simulate-failures",
            post(testing::simulate_failures),
        )
        .route("/testing/test-cases", get(testing::list_test_cases))
        .route(
            "/testing/test-cases/{id}/run",
            post(testing::run_test_case),
        )
        .route("/testing/test-suite/run", post(testing::run_test_suite))
        .route("/testing/health", get(testing::testing_health))
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
