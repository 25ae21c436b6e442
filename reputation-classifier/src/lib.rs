//! The pure Classifier: `(rolling window of failures, estimated
//! sent count) -> derived health snapshot + status tier`.
//!
//! No I/O, no logging, no metrics — same inputs always produce the same
//! output. Callers (the Aggregator, the manual-quarantine endpoint, the
//! testing harness) build a [`ClassifierSnapshot`] and call [`classify`].

pub mod classify;
pub mod config;
pub mod estimate;
pub mod snapshot;

pub use classify::{categorize_issue, classify, IssueType};
pub use config::{ClassifierConfig, Tier, TIERS};
pub use estimate::estimate_sent;
pub use snapshot::ClassifierSnapshot;
