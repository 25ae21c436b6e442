//! Shared plumbing for the IP deliverability reputation engine.
//!
//! Every other `reputation-*` crate depends on this one for the domain
//! newtypes, the error-kind taxonomy, the shutdown signal, and process-wide
//! logging setup.

pub mod config;
pub mod error;
pub mod logging;
pub mod providers;
pub mod signal;
pub mod status;
pub mod types;

pub use error::{ErrorKind, ReputationError};
pub use signal::Signal;
pub use status::ReputationStatus;
pub use types::{EnhancedCode, Fingerprint, RecipientDomain, SendingIp};
