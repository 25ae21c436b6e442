use reputation_common::ErrorKind;

/// Error surface for the Aggregator (C4), following the same
/// `thiserror`-enum-with-`kind()` shape as every other crate in this
/// workspace.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("reputation store error: {0}")]
    Store(#[from] reputation_store::StoreError),

    #[error("already running")]
    AlreadyRunning,
}

impl AggregatorError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => e.kind(),
            Self::AlreadyRunning => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
