//! Persistence traits and backends for the IP deliverability reputation
//! engine.
//!
//! Every store is a trait (`EventStore`, `ReputationStore`, `DnsblCheckStore`,
//! `ReservationStore`) with an in-memory implementation used by default and
//! in tests. The `postgres` feature adds a `sqlx`-backed implementation of
//! the same traits for production deployments.

pub mod dnsbl_store;
pub mod error;
pub mod event_store;
pub mod model;
pub mod reputation_store;
pub mod reservation_store;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use dnsbl_store::{DnsblCheckStore, MemoryDnsblCheckStore};
pub use error::{Result, StoreError};
pub use event_store::{EventStore, MemoryEventStore};
pub use reputation_store::{MemoryReputationStore, ReputationStore};
pub use reservation_store::{
    MemoryReservationStore, ReservationStatistics, ReservationStore, ReservedIpFilter,
};

#[cfg(feature = "postgres")]
pub use postgres::PgStore;
