use reputation_common::ErrorKind;

/// Error surface for the Provisioner (C7) and its upstream IaaS client,
/// following the same `thiserror`-enum-with-`kind()` shape as the rest of
/// the workspace.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("reputation store error: {0}")]
    Store(#[from] reputation_store::StoreError),

    #[error("requested count exceeds remaining quota")]
    QuotaExceeded,

    #[error("reserved IP block not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream IaaS API error: {0}")]
    Upstream(String),

    #[error("upstream IaaS API rate limited us")]
    UpstreamRateLimited,

    #[error("upstream IaaS API request timed out")]
    UpstreamTimeout,

    #[error("request was cancelled")]
    Cancelled,
}

impl ProvisionError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => e.kind(),
            Self::QuotaExceeded => ErrorKind::QuotaExceeded,
            Self::NotFound => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Upstream(_) | Self::UpstreamTimeout => ErrorKind::UpstreamUnavailable,
            Self::UpstreamRateLimited => ErrorKind::UpstreamRateLimited,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl From<reqwest::Error> for ProvisionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout
        } else if err.status().is_some_and(|s| s.as_u16() == 429) {
            Self::UpstreamRateLimited
        } else {
            Self::Upstream(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
