//! Liveness/readiness probes for the IP deliverability reputation engine:
//! an axum-based health server.

mod checker;
mod config;
mod error;
mod server;

pub use checker::{HealthChecker, HealthStatus};
pub use config::HealthConfig;
pub use error::HealthError;
pub use server::HealthServer;
