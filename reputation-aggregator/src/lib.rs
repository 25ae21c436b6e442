//! The periodic Aggregator: folds windowed delivery failures into
//! per-IP [`reputation_store::model::ReputationState`] by delegating to the
//! pure Classifier, records status-change audit entries, and triggers DNSBL
//! probes on transition via a ticker/run-guard/drain structure.

pub mod config;
pub mod error;
pub mod worker;

pub use config::AggregatorConfig;
pub use error::{AggregatorError, Result};
pub use worker::{Aggregator, IpOutcome, TickSummary};
