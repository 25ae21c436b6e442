//! The DNSBL Prober: bounded-concurrency reverse-lookup probing
//! of sending IPs against a curated blocklist-zone list, built on
//! `hickory_resolver`.

pub mod config;
pub mod error;
pub mod prober;
pub mod severity;

pub use config::DnsblConfig;
pub use error::DnsblError;
pub use prober::DnsblProber;
pub use severity::derive_severity;
