use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use reputation_common::SendingIp;

use crate::{
    error::{Result, StoreError},
    model::{BlacklistHistory, ReservationAttempt, ReservedIp, ReservedIpStatus},
};

/// Filters accepted by [`ReservationStore::list_reserved`].
#[derive(Debug, Clone, Default)]
pub struct ReservedIpFilter {
    pub status: Option<ReservedIpStatus>,
    pub blacklisted: Option<bool>,
    pub location: Option<String>,
}

/// Aggregate counts exposed by `GET /ips/statistics`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ReservationStatistics {
    pub total: u64,
    pub reserved: u64,
    pub in_use: u64,
    pub released: u64,
    pub quarantined: u64,
    pub blacklisted: u64,
}

/// C6: persisted lifecycle state for externally reserved IP blocks.
#[async_trait]
pub trait ReservationStore: Send + Sync + std::fmt::Debug {
    async fn get_by_uid(&self, uid: ulid::Ulid) -> Result<Option<ReservedIp>>;
    async fn get_by_ip(&self, ip: &SendingIp) -> Result<Option<ReservedIp>>;
    async fn insert(&self, reserved: ReservedIp) -> Result<()>;
    async fn update(&self, reserved: ReservedIp) -> Result<()>;
    async fn delete(&self, uid: ulid::Ulid) -> Result<()>;
    async fn list_reserved(&self, filter: ReservedIpFilter) -> Result<Vec<ReservedIp>>;

    /// Bumps `last_checked_at` in addition to the blacklist fields.
    async fn update_blacklist_status(
        &self,
        uid: ulid::Ulid,
        is_blacklisted: bool,
        zones: std::collections::BTreeSet<String>,
    ) -> Result<()>;

    async fn record_attempt(&self, attempt: ReservationAttempt) -> Result<()>;
    async fn append_blacklist_history(&self, entry: BlacklistHistory) -> Result<()>;
    async fn statistics(&self) -> Result<ReservationStatistics>;

    /// Every known provider block id currently referenced by a `ReservedIp`
    /// with status `reserved` or `in_use` (used by the Provisioner's
    /// protected-cleanup routine, C7).
    async fn referenced_block_ids(&self) -> Result<std::collections::HashSet<String>>;
}

#[derive(Debug, Default)]
pub struct MemoryReservationStore {
    reserved: DashMap<ulid::Ulid, ReservedIp>,
    attempts: DashMap<u64, ReservationAttempt>,
    history: DashMap<u64, BlacklistHistory>,
    next_attempt_id: AtomicU64,
    next_history_id: AtomicU64,
}

impl MemoryReservationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReservationStore for MemoryReservationStore {
    async fn get_by_uid(&self, uid: ulid::Ulid) -> Result<Option<ReservedIp>> {
        Ok(self.reserved.get(&uid).map(|entry| entry.value().clone()))
    }

    async fn get_by_ip(&self, ip: &SendingIp) -> Result<Option<ReservedIp>> {
        Ok(self
            .reserved
            .iter()
            .find(|entry| &entry.value().ip == ip)
            .map(|entry| entry.value().clone()))
    }

    async fn insert(&self, reserved: ReservedIp) -> Result<()> {
        if self.reserved.contains_key(&reserved.uid) {
            return Err(StoreError::InvalidInput(format!(
                "reserved IP uid {} already exists",
                reserved.uid
            )));
        }
        self.reserved.insert(reserved.uid, reserved);
        Ok(())
    }

    async fn update(&self, reserved: ReservedIp) -> Result<()> {
        if !self.reserved.contains_key(&reserved.uid) {
            return Err(StoreError::NotFound);
        }
        self.reserved.insert(reserved.uid, reserved);
        Ok(())
    }

    async fn delete(&self, uid: ulid::Ulid) -> Result<()> {
        self.reserved.remove(&uid).ok_or(StoreError::NotFound)?;
        Ok(())
    }

    async fn list_reserved(&self, filter: ReservedIpFilter) -> Result<Vec<ReservedIp>> {
        let mut items: Vec<ReservedIp> = self
            .reserved
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|ip| filter.status.is_none_or(|s| ip.status == s))
            .filter(|ip| filter.blacklisted.is_none_or(|b| ip.is_blacklisted == b))
            .filter(|ip| {
                filter
                    .location
                    .as_ref()
                    .is_none_or(|loc| &ip.datacenter_location == loc)
            })
            .collect();
        items.sort_by(|a, b| b.reserved_at.cmp(&a.reserved_at));
        Ok(items)
    }

    async fn update_blacklist_status(
        &self,
        uid: ulid::Ulid,
        is_blacklisted: bool,
        zones: std::collections::BTreeSet<String>,
    ) -> Result<()> {
        let mut entry = self.reserved.get_mut(&uid).ok_or(StoreError::NotFound)?;
        entry.is_blacklisted = is_blacklisted;
        entry.blacklist_details = zones;
        entry.last_checked_at = chrono::Utc::now();
        Ok(())
    }

    async fn record_attempt(&self, mut attempt: ReservationAttempt) -> Result<()> {
        attempt.id = self.next_attempt_id.fetch_add(1, Ordering::Relaxed);
        self.attempts.insert(attempt.id, attempt);
        Ok(())
    }

    async fn append_blacklist_history(&self, mut entry: BlacklistHistory) -> Result<()> {
        entry.id = self.next_history_id.fetch_add(1, Ordering::Relaxed);
        self.history.insert(entry.id, entry);
        Ok(())
    }

    async fn statistics(&self) -> Result<ReservationStatistics> {
        let mut stats = ReservationStatistics::default();
        for entry in &self.reserved {
            let ip = entry.value();
            stats.total += 1;
            match ip.status {
                ReservedIpStatus::Reserved => stats.reserved += 1,
                ReservedIpStatus::InUse => stats.in_use += 1,
                ReservedIpStatus::Released => stats.released += 1,
                ReservedIpStatus::Quarantined => stats.quarantined += 1,
            }
            if ip.is_blacklisted {
                stats.blacklisted += 1;
            }
        }
        Ok(stats)
    }

    async fn referenced_block_ids(&self) -> Result<std::collections::HashSet<String>> {
        Ok(self
            .reserved
            .iter()
            .filter(|entry| {
                matches!(
                    entry.value().status,
                    ReservedIpStatus::Reserved | ReservedIpStatus::InUse
                )
            })
            .map(|entry| entry.value().provider_block_id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn reserved(ip: &str, status: ReservedIpStatus, block_id: &str) -> ReservedIp {
        ReservedIp {
            uid: ulid::Ulid::from_parts(0, u128::from(rand_seed(ip))),
            ip: SendingIp::parse(ip).unwrap(),
            provider_block_id: block_id.into(),
            datacenter_location: "us-east".into(),
            status,
            is_blacklisted: false,
            blacklist_details: BTreeSet::new(),
            reserved_at: Utc::now(),
            last_checked_at: Utc::now(),
            released_at: None,
            assignee: None,
            usage_counter: 0,
            metadata: AHashMap::default(),
            notes: String::new(),
        }
    }

    fn rand_seed(ip: &str) -> u64 {
        ip.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)))
    }

    #[tokio::test]
    async fn insert_then_get_by_ip() {
        let store = MemoryReservationStore::new();
        let record = reserved("203.0.113.10", ReservedIpStatus::Reserved, "block-1");
        store.insert(record.clone()).await.unwrap();

        let ip = SendingIp::parse("203.0.113.10").unwrap();
        let fetched = store.get_by_ip(&ip).await.unwrap().unwrap();
        assert_eq!(fetched.uid, record.uid);
    }

    #[tokio::test]
    async fn duplicate_uid_insert_fails() {
        let store = MemoryReservationStore::new();
        let record = reserved("203.0.113.10", ReservedIpStatus::Reserved, "block-1");
        store.insert(record.clone()).await.unwrap();
        assert!(store.insert(record).await.is_err());
    }

    #[tokio::test]
    async fn referenced_block_ids_excludes_released() {
        let store = MemoryReservationStore::new();
        store
            .insert(reserved("203.0.113.10", ReservedIpStatus::Reserved, "block-1"))
            .await
            .unwrap();
        store
            .insert(reserved("203.0.113.11", ReservedIpStatus::Released, "block-2"))
            .await
            .unwrap();

        let referenced = store.referenced_block_ids().await.unwrap();
        assert!(referenced.contains("block-1"));
        assert!(!referenced.contains("block-2"));
    }

    #[tokio::test]
    async fn statistics_counts_by_status_and_blacklist() {
        let store = MemoryReservationStore::new();
        store
            .insert(reserved("203.0.113.10", ReservedIpStatus::Reserved, "block-1"))
            .await
            .unwrap();
        let mut quarantined = reserved("203.0.113.11", ReservedIpStatus::Quarantined, "block-2");
        quarantined.is_blacklisted = true;
        store.insert(quarantined).await.unwrap();

        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.reserved, 1);
        assert_eq!(stats.quarantined, 1);
        assert_eq!(stats.blacklisted, 1);
    }

    #[tokio::test]
    async fn update_blacklist_status_bumps_last_checked_at() {
        let store = MemoryReservationStore::new();
        let record = reserved("203.0.113.10", ReservedIpStatus::Reserved, "block-1");
        let uid = record.uid;
        let original_checked_at = record.last_checked_at;
        store.insert(record).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let mut zones = BTreeSet::new();
        zones.insert("spamhaus.example".to_string());
        store.update_blacklist_status(uid, true, zones.clone()).await.unwrap();

        let updated = store.get_by_uid(uid).await.unwrap().unwrap();
        assert!(updated.is_blacklisted);
        assert_eq!(updated.blacklist_details, zones);
        assert!(updated.last_checked_at > original_checked_at);
    }
}
