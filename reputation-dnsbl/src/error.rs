use reputation_common::ErrorKind;

/// DNSBL prober error surface: a small `thiserror` enum with a
/// temporary/permanent classification.
#[derive(Debug, thiserror::Error)]
pub enum DnsblError {
    #[error("IP address is not eligible for DNSBL probing: {0}")]
    InvalidIp(String),

    #[error("every zone query failed or timed out")]
    ProbeTimeout,

    #[error("resolver error: {0}")]
    Resolve(#[from] hickory_resolver::error::ResolveError),
}

impl DnsblError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidIp(_) => ErrorKind::InvalidInput,
            Self::ProbeTimeout => ErrorKind::ProbeTimeout,
            Self::Resolve(_) => ErrorKind::UpstreamUnavailable,
        }
    }

    /// Whether this failure should be treated as "not listed" rather than
    /// surfaced to the caller.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::ProbeTimeout | Self::Resolve(_))
    }
}

pub type Result<T> = std::result::Result<T, DnsblError>;
