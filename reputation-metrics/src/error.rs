use thiserror::Error;

/// Errors that can occur while initializing or exporting metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics system already initialized")]
    AlreadyInitialized,

    #[error("opentelemetry error: {0}")]
    OpenTelemetry(String),
}
