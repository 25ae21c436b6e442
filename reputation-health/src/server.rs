//! Liveness/readiness HTTP server.

use std::{sync::Arc, time::Duration};

use axum::{Json, Router, extract::State, http::StatusCode, response::{IntoResponse, Response}, routing::get};
use reputation_common::Signal;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::{checker::HealthChecker, config::HealthConfig, error::HealthError};

pub struct HealthServer {
    listener: TcpListener,
    router: Router,
}

impl HealthServer {
    /// # Errors
    /// Returns an error if binding to `config.listen_address` fails.
    pub async fn new(
        config: HealthConfig,
        health_checker: Arc<HealthChecker>,
    ) -> Result<Self, HealthError> {
        let listener =
            TcpListener::bind(&config.listen_address)
                .await
                .map_err(|e| HealthError::BindError {
                    address: config.listen_address.clone(),
                    source: e,
                })?;

        tracing::info!(address = %config.listen_address, "health check server bound");

        let router = Router::new()
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .with_state(health_checker)
            .layer(TimeoutLayer::new(Duration::from_secs(1)));

        Ok(Self { listener, router })
    }

    /// # Errors
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), HealthError> {
        tracing::info!("health check server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("health check server received shutdown signal");
            })
            .await
            .map_err(|e| HealthError::ServerError(e.to_string()))?;

        tracing::info!("health check server stopped");
        Ok(())
    }
}

async fn liveness_handler(State(health_checker): State<Arc<HealthChecker>>) -> Response {
    if health_checker.is_alive() {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
    }
}

async fn readiness_handler(State(health_checker): State<Arc<HealthChecker>>) -> Response {
    if health_checker.is_ready() {
        (StatusCode::OK, "OK").into_response()
    } else {
        let status = health_checker.get_status();
        tracing::warn!(
            store_ready = status.store_ready,
            aggregator_ready = status.aggregator_ready,
            dnsbl_ready = status.dnsbl_ready,
            "readiness probe failed"
        );
        (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn liveness_always_passes() {
        let checker = Arc::new(HealthChecker::new());
        let response = liveness_handler(State(checker)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_fails_until_every_component_is_ready() {
        let checker = Arc::new(HealthChecker::new());
        assert_eq!(
            readiness_handler(State(Arc::clone(&checker))).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        checker.set_store_ready(true);
        checker.set_aggregator_ready(true);
        checker.set_dnsbl_ready(true);
        assert_eq!(
            readiness_handler(State(checker)).await.status(),
            StatusCode::OK
        );
    }
}
