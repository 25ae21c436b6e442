use reputation_common::ErrorKind;

/// Error surface for every store in this crate: a small `thiserror` enum
/// with a `kind()` classification method rather than matching on variants
/// downstream.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::StorageUnavailable,
            Self::NotFound => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            #[cfg(feature = "postgres")]
            Self::Sqlx(_) => ErrorKind::StorageUnavailable,
        }
    }

    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        self.kind().is_recoverable()
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
