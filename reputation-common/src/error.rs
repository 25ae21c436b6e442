//! The shared error-kind taxonomy.
//!
//! Per-crate error enums (`StoreError`, `DnsblError`, `ProvisionError`,
//! `ApiError`, …) each carry their own `thiserror::Error` variants in a
//! one-enum-per-concern shape, but every one of them can be classified into
//! this small, closed set of *kinds* so that `reputation-api` has a single
//! place to map errors onto HTTP status classes and retry logic doesn't need
//! to match on crate-specific variants.

use serde::{Deserialize, Serialize};

/// Closed error-kind enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    DuplicateFingerprint,
    StorageUnavailable,
    UpstreamUnavailable,
    UpstreamRateLimited,
    QuotaExceeded,
    ProbeTimeout,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// 4xx vs 5xx classification for `reputation-api`.
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(
            self,
            Self::InvalidInput
                | Self::NotFound
                | Self::DuplicateFingerprint
                | Self::QuotaExceeded
        )
    }

    /// Whether a caller should retry the operation (possibly after a delay).
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable
                | Self::UpstreamUnavailable
                | Self::UpstreamRateLimited
                | Self::ProbeTimeout
        )
    }

    /// Whether this kind reflects transient infrastructure trouble rather
    /// than a business-rule rejection.
    #[must_use]
    pub const fn is_temporary(self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable | Self::UpstreamUnavailable | Self::ProbeTimeout
        )
    }

    #[must_use]
    pub const fn is_shutdown(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::DuplicateFingerprint => "duplicate_fingerprint",
            Self::StorageUnavailable => "storage_unavailable",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::UpstreamRateLimited => "upstream_rate_limited",
            Self::QuotaExceeded => "quota_exceeded",
            Self::ProbeTimeout => "probe_timeout",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generic, kind-tagged error for call sites that don't need a richer
/// per-crate enum (e.g. config loading). Crate-specific errors should prefer
/// their own `thiserror` enum with a `kind()` method instead of this type.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ReputationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ReputationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_are_client_errors() {
        assert!(ErrorKind::InvalidInput.is_client_error());
        assert!(ErrorKind::NotFound.is_client_error());
        assert!(ErrorKind::QuotaExceeded.is_client_error());
        assert!(!ErrorKind::StorageUnavailable.is_client_error());
    }

    #[test]
    fn infrastructure_errors_are_recoverable() {
        assert!(ErrorKind::StorageUnavailable.is_recoverable());
        assert!(ErrorKind::UpstreamRateLimited.is_recoverable());
        assert!(!ErrorKind::InvalidInput.is_recoverable());
    }

    #[test]
    fn display_uses_snake_case_names() {
        assert_eq!(ErrorKind::DuplicateFingerprint.to_string(), "duplicate_fingerprint");
    }
}
