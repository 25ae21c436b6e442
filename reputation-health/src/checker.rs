//! Component readiness tracking for this engine's own components: the
//! stores, the Aggregator, and the DNSBL resolver.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

#[derive(Debug)]
pub struct HealthChecker {
    store_ready: Arc<AtomicBool>,
    aggregator_ready: Arc<AtomicBool>,
    dnsbl_ready: Arc<AtomicBool>,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthChecker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store_ready: Arc::new(AtomicBool::new(false)),
            aggregator_ready: Arc::new(AtomicBool::new(false)),
            dnsbl_ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_store_ready(&self, ready: bool) {
        self.store_ready.store(ready, Ordering::Relaxed);
    }

    pub fn set_aggregator_ready(&self, ready: bool) {
        self.aggregator_ready.store(ready, Ordering::Relaxed);
    }

    pub fn set_dnsbl_ready(&self, ready: bool) {
        self.dnsbl_ready.store(ready, Ordering::Relaxed);
    }

    /// For liveness we only need to respond; if the process can't, the HTTP
    /// server itself is dead and the orchestrator detects that via timeout.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        true
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.store_ready.load(Ordering::Relaxed)
            && self.aggregator_ready.load(Ordering::Relaxed)
            && self.dnsbl_ready.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get_status(&self) -> HealthStatus {
        HealthStatus {
            alive: self.is_alive(),
            ready: self.is_ready(),
            store_ready: self.store_ready.load(Ordering::Relaxed),
            aggregator_ready: self.aggregator_ready.load(Ordering::Relaxed),
            dnsbl_ready: self.dnsbl_ready.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "status struct intentionally has multiple boolean fields for clarity"
)]
pub struct HealthStatus {
    pub alive: bool,
    pub ready: bool,
    pub store_ready: bool,
    pub aggregator_ready: bool,
    pub dnsbl_ready: bool,
}
