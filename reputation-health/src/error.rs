use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("failed to bind health server to {address}: {source}")]
    BindError {
        address: String,
        source: std::io::Error,
    },

    #[error("health server error: {0}")]
    ServerError(String),
}
