//! Shared application state handed to every axum handler via
//! `State<Arc<AppState>>`, covering the handful of components the
//! query/action surface fronts.

use std::sync::Arc;

use reputation_aggregator::Aggregator;
use reputation_dnsbl::DnsblProber;
use reputation_health::HealthChecker;
use reputation_provisioner::Provisioner;
use reputation_store::{DnsblCheckStore, EventStore, ReputationStore, ReservationStore};

pub struct AppState {
    pub event_store: Arc<dyn EventStore>,
    pub reputation_store: Arc<dyn ReputationStore>,
    pub dnsbl_check_store: Arc<dyn DnsblCheckStore>,
    pub reservation_store: Arc<dyn ReservationStore>,
    pub prober: Arc<DnsblProber>,
    pub aggregator: Arc<Aggregator>,
    pub provisioner: Arc<Provisioner>,
    pub health_checker: Arc<HealthChecker>,
    /// How many `IpAction` rows `GET /ips/{ip}/reputation` includes.
    pub recent_actions_limit: usize,
    /// Shared secret the inbound webhook must present as a bearer token
    ///. `None` leaves the endpoint unauthenticated, which is only
    /// appropriate behind a private network boundary.
    pub webhook_shared_secret: Option<String>,
}
