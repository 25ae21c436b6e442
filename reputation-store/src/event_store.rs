use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reputation_common::{Fingerprint, SendingIp};

use crate::{error::Result, model::FailureEvent};

/// C1: append-only log of delivery failures, deduplicated by fingerprint.
///
/// Implementations MUST treat a fingerprint collision as a no-op, never an
/// error — model it as a uniqueness constraint with an insert-or-do-nothing
/// semantic, never an application-side check-then-insert.
#[async_trait]
pub trait EventStore: Send + Sync + std::fmt::Debug {
    /// Insert `event` atomically. Returns `true` if it was newly inserted,
    /// `false` if `event.fingerprint` already existed (silent no-op, not an
    /// error).
    async fn record_failure(&self, event: FailureEvent) -> Result<bool>;

    /// Failures for `ip` with `occurred_at >= since`, newest-first.
    async fn failures_by_ip_since(
        &self,
        ip: &SendingIp,
        since: DateTime<Utc>,
    ) -> Result<Vec<FailureEvent>>;

    /// Distinct sending IPs with at least one failure since `since`.
    async fn ips_with_activity_since(&self, since: DateTime<Utc>) -> Result<Vec<SendingIp>>;

    /// Delete events older than `cutoff`; returns the count removed. A
    /// retention hook — no default caller schedules this.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// In-memory `EventStore`, using a `RwLock`-free, `DashMap`-backed approach.
/// Suitable for tests and small
/// single-process deployments; the Postgres backend is used for anything
/// that must outlive the process or be queried across multiple replicas.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: DashMap<Fingerprint, FailureEvent>,
    next_id: AtomicU64,
}

impl MemoryEventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn record_failure(&self, mut event: FailureEvent) -> Result<bool> {
        if self.events.contains_key(&event.fingerprint) {
            return Ok(false);
        }
        event.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // `entry().or_insert()` keeps this atomic even under a racing writer
        // that inserted the same fingerprint between the `contains_key`
        // check above and here.
        let mut inserted = false;
        self.events.entry(event.fingerprint.clone()).or_insert_with(|| {
            inserted = true;
            event
        });
        Ok(inserted)
    }

    async fn failures_by_ip_since(
        &self,
        ip: &SendingIp,
        since: DateTime<Utc>,
    ) -> Result<Vec<FailureEvent>> {
        let mut matches: Vec<FailureEvent> = self
            .events
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|event| &event.sending_ip == ip && event.occurred_at >= since)
            .collect();
        matches.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(matches)
    }

    async fn ips_with_activity_since(&self, since: DateTime<Utc>) -> Result<Vec<SendingIp>> {
        let mut ips: Vec<SendingIp> = self
            .events
            .iter()
            .filter(|entry| entry.value().occurred_at >= since)
            .map(|entry| entry.value().sending_ip.clone())
            .collect();
        ips.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ips.dedup();
        Ok(ips)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let stale: Vec<Fingerprint> = self
            .events
            .iter()
            .filter(|entry| entry.value().occurred_at < cutoff)
            .map(|entry| entry.key().clone())
            .collect();
        let removed = stale.len() as u64;
        for fingerprint in stale {
            self.events.remove(&fingerprint);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reputation_common::RecipientDomain;

    fn event(ip: &str, fingerprint: &str, occurred_at: DateTime<Utc>) -> FailureEvent {
        FailureEvent {
            id: 0,
            sending_ip: SendingIp::parse(ip).unwrap(),
            recipient: "user@example.com".to_string(),
            recipient_domain: RecipientDomain::new("example.com"),
            smtp_code: 550,
            enhanced_code: None,
            reason: "mailbox unavailable".into(),
            receiving_mx: "mx.example.com".into(),
            occurred_at,
            fingerprint: Fingerprint::new(fingerprint),
            attempt_ordinal: 1,
        }
    }

    #[tokio::test]
    async fn duplicate_fingerprint_is_a_silent_no_op() {
        let store = MemoryEventStore::new();
        let now = Utc::now();
        assert!(store
            .record_failure(event("203.0.113.10", "fp-1", now))
            .await
            .unwrap());
        assert!(!store
            .record_failure(event("203.0.113.10", "fp-1", now))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn failures_by_ip_since_is_newest_first_and_scoped_to_ip() {
        let store = MemoryEventStore::new();
        let t0 = Utc::now() - chrono::Duration::minutes(10);
        let t1 = Utc::now() - chrono::Duration::minutes(5);
        store
            .record_failure(event("203.0.113.10", "fp-1", t0))
            .await
            .unwrap();
        store
            .record_failure(event("203.0.113.10", "fp-2", t1))
            .await
            .unwrap();
        store
            .record_failure(event("203.0.113.11", "fp-3", t1))
            .await
            .unwrap();

        let since = Utc::now() - chrono::Duration::minutes(15);
        let ip = SendingIp::parse("203.0.113.10").unwrap();
        let results = store.failures_by_ip_since(&ip, since).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].fingerprint.as_str(), "fp-2");
        assert_eq!(results[1].fingerprint.as_str(), "fp-1");
    }

    #[tokio::test]
    async fn ips_with_activity_since_excludes_stale_events() {
        let store = MemoryEventStore::new();
        let stale = Utc::now() - chrono::Duration::hours(2);
        let fresh = Utc::now();
        store
            .record_failure(event("203.0.113.10", "fp-1", stale))
            .await
            .unwrap();
        store
            .record_failure(event("203.0.113.11", "fp-2", fresh))
            .await
            .unwrap();

        let since = Utc::now() - chrono::Duration::minutes(15);
        let ips = store.ips_with_activity_since(since).await.unwrap();
        assert_eq!(ips, vec![SendingIp::parse("203.0.113.11").unwrap()]);
    }

    #[tokio::test]
    async fn purge_older_than_removes_only_stale_events() {
        let store = MemoryEventStore::new();
        let stale = Utc::now() - chrono::Duration::days(60);
        let fresh = Utc::now();
        store
            .record_failure(event("203.0.113.10", "fp-1", stale))
            .await
            .unwrap();
        store
            .record_failure(event("203.0.113.10", "fp-2", fresh))
            .await
            .unwrap();

        let removed = store
            .purge_older_than(Utc::now() - chrono::Duration::days(30))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        let remaining = store
            .ips_with_activity_since(Utc::now() - chrono::Duration::days(365))
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
    }
}
