//! The query/action surface's HTTP server, structured identically to
//! `reputation_health::HealthServer` (bind at construction, serve with
//! graceful shutdown).

use std::sync::Arc;

use axum::Router;
use reputation_common::Signal;
use tokio::net::TcpListener;

use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum ApiServerError {
    #[error("failed to bind API server to {address}: {source}")]
    BindError {
        address: String,
        source: std::io::Error,
    },

    #[error("API server error: {0}")]
    ServerError(String),
}

pub struct ApiServer {
    listener: TcpListener,
    router: Router,
}

impl ApiServer {
    /// # Errors
    /// Returns an error if binding to `listen_address` fails.
    pub async fn new(
        listen_address: &str,
        state: Arc<AppState>,
    ) -> Result<Self, ApiServerError> {
        let listener = TcpListener::bind(listen_address)
            .await
            .map_err(|e| ApiServerError::BindError {
                address: listen_address.to_string(),
                source: e,
            })?;

        tracing::info!(address = %listen_address, "query/action API server bound");

        Ok(Self {
            listener,
            router: crate::router::build_router(state),
        })
    }

    /// # Errors
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), ApiServerError> {
        tracing::info!("query/action API server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("query/action API server received shutdown signal");
            })
            .await
            .map_err(|e| ApiServerError::ServerError(e.to_string()))?;

        tracing::info!("query/action API server stopped");
        Ok(())
    }
}
