//! The `{error, message}` JSON error shape that every handler in
//! this crate converges on, following the same per-crate
//! `thiserror`-enum-with-`kind()` convention the rest of the workspace uses,
//! but with an `IntoResponse` impl doing the kind→status mapping once.

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use reputation_common::ErrorKind;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] reputation_store::StoreError),

    #[error(transparent)]
    Dnsbl(#[from] reputation_dnsbl::DnsblError),

    #[error(transparent)]
    Aggregator(#[from] reputation_aggregator::AggregatorError),

    #[error(transparent)]
    Provision(#[from] reputation_provisioner::ProvisionError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found")]
    NotFound,
}

impl ApiError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => e.kind(),
            Self::Dnsbl(e) => e.kind(),
            Self::Aggregator(e) => e.kind(),
            Self::Provision(e) => e.kind(),
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound => ErrorKind::NotFound,
        }
    }

    fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidInput | ErrorKind::DuplicateFingerprint => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::QuotaExceeded => StatusCode::CONFLICT,
            ErrorKind::UpstreamRateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::StorageUnavailable
            | ErrorKind::UpstreamUnavailable
            | ErrorKind::ProbeTimeout
            | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.kind().as_str(),
            message: self.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %body.message, kind = body.error, "request failed");
        }
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Parse a path-supplied IP string, mapping a parse failure onto
/// [`ApiError::InvalidInput`] instead of the raw [`ErrorKind`] the domain
/// newtype itself returns.
pub fn parse_ip(raw: &str) -> Result<reputation_common::SendingIp> {
    reputation_common::SendingIp::parse(raw)
        .map_err(|_| ApiError::InvalidInput(format!("{raw:?} is not a valid IP address")))
}

/// Parse a path-supplied ULID string.
pub fn parse_uid(raw: &str) -> Result<ulid::Ulid> {
    raw.parse()
        .map_err(|_| ApiError::InvalidInput(format!("{raw:?} is not a valid reservation id")))
}
