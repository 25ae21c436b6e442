use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use reputation_common::SendingIp;

use crate::{error::Result, model::DnsblCheck};

/// Append-only store for DNSBL probe results. C5 is the sole writer; everyone else reads.
#[async_trait]
pub trait DnsblCheckStore: Send + Sync + std::fmt::Debug {
    async fn record_check(&self, check: DnsblCheck) -> Result<()>;

    /// The most recent check for `ip`, if any have been recorded.
    async fn latest_for_ip(&self, ip: &SendingIp) -> Result<Option<DnsblCheck>>;
}

#[derive(Debug, Default)]
pub struct MemoryDnsblCheckStore {
    checks: DashMap<SendingIp, Vec<DnsblCheck>>,
    next_id: AtomicU64,
}

impl MemoryDnsblCheckStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DnsblCheckStore for MemoryDnsblCheckStore {
    async fn record_check(&self, mut check: DnsblCheck) -> Result<()> {
        check.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.checks.entry(check.ip.clone()).or_default().push(check);
        Ok(())
    }

    async fn latest_for_ip(&self, ip: &SendingIp) -> Result<Option<DnsblCheck>> {
        Ok(self
            .checks
            .get(ip)
            .and_then(|entry| entry.value().iter().max_by_key(|c| c.checked_at).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn check(ip: &str, checked_at: chrono::DateTime<Utc>) -> DnsblCheck {
        DnsblCheck {
            id: 0,
            ip: SendingIp::parse(ip).unwrap(),
            checked_at,
            listed: false,
            listings: BTreeSet::new(),
            duration_ms: 10,
            severity: crate::model::Severity::None,
            metadata: AHashMap::default(),
        }
    }

    #[tokio::test]
    async fn latest_for_ip_returns_the_most_recently_checked_entry() {
        let store = MemoryDnsblCheckStore::new();
        let ip = SendingIp::parse("203.0.113.10").unwrap();
        let earlier = Utc::now() - chrono::Duration::minutes(10);
        let later = Utc::now();
        store.record_check(check("203.0.113.10", earlier)).await.unwrap();
        store.record_check(check("203.0.113.10", later)).await.unwrap();

        let latest = store.latest_for_ip(&ip).await.unwrap().unwrap();
        assert_eq!(latest.checked_at, later);
    }

    #[tokio::test]
    async fn latest_for_ip_is_none_when_unchecked() {
        let store = MemoryDnsblCheckStore::new();
        let ip = SendingIp::parse("203.0.113.11").unwrap();
        assert!(store.latest_for_ip(&ip).await.unwrap().is_none());
    }
}
