//! The Query/Action Surface: axum handlers fronting the
//! stores, Classifier, DNSBL Prober, Aggregator, and Provisioner, following
//! `reputation_health::HealthServer`'s bind-then-serve shape.

mod auth;
mod error;
mod reputation;
mod reservation;
mod router;
mod server;
mod state;
mod testing;
mod webhook;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ApiServer, ApiServerError};
pub use state::AppState;

pub use reputation::ReputationView;
pub use reservation::{ListReservedQuery, ReserveRequest};
pub use testing::{seed_test_cases, SimulateFailuresRequest, TestCase};
pub use webhook::{WebhookEvent, WebhookPayload, WebhookResponse};
