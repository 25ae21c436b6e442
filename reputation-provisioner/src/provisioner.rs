//! The Provisioner itself: a request-scoped acquire-vet-commit
//! loop over the upstream IaaS block API, plus the protected-block cleanup
//! routine and the recheck-blacklist operation.

use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::Utc;
use reputation_common::{Signal, SendingIp};
use reputation_dnsbl::DnsblProber;
use reputation_store::{
    ReservationStore,
    model::{ActionTaken, BlacklistHistory, ReservationAttempt, ReservedIp, ReservedIpStatus},
};
use serde::Serialize;

use crate::{
    circuit_breaker::CircuitBreaker,
    config::ProvisionerConfig,
    error::{ProvisionError, Result},
    upstream::UpstreamClient,
};

/// Remaining headroom against the operator-configured `estimated_quota`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Quota {
    pub total: u32,
    pub consumed: u32,
    pub remaining: u32,
}

/// Outcome of one `Provisioner::reserve` invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionResult {
    pub success_count: u32,
    pub failure_count: u32,
    pub blacklisted_count: u32,
    pub reserved_ips: Vec<ReservedIp>,
    pub attempts: u32,
}

/// Outcome of `Provisioner::cleanup_single_ip_blocks`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupResult {
    pub inspected: u32,
    pub deleted: u32,
    pub protected: u32,
    pub retained: u32,
}

pub struct Provisioner {
    reservation_store: Arc<dyn ReservationStore>,
    prober: Arc<DnsblProber>,
    upstream: Arc<dyn UpstreamClient>,
    circuit_breaker: CircuitBreaker,
    config: ProvisionerConfig,
}

impl Provisioner {
    #[must_use]
    pub fn new(
        reservation_store: Arc<dyn ReservationStore>,
        prober: Arc<DnsblProber>,
        upstream: Arc<dyn UpstreamClient>,
        config: ProvisionerConfig,
    ) -> Self {
        let circuit_breaker = CircuitBreaker::new(config.circuit_breaker.clone());
        Self {
            reservation_store,
            prober,
            upstream,
            circuit_breaker,
            config,
        }
    }

    /// Run an upstream call through the circuit breaker: rejected immediately while the breaker is
    /// open, otherwise the outcome feeds back into its state.
    async fn guarded_upstream<T>(
        &self,
        call: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        if !self.circuit_breaker.should_allow() {
            return Err(ProvisionError::Upstream(
                "circuit breaker open, upstream IaaS API considered unavailable".to_string(),
            ));
        }
        match call.await {
            Ok(value) => {
                self.circuit_breaker.record_success();
                Ok(value)
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                Err(e)
            }
        }
    }

    /// `Quota()`. Consumption is every `ReservedIp` not yet
    /// released — `reserved`, `in_use`, and `quarantined` all still hold a
    /// slot against the provider-side cap.
    pub async fn quota(&self) -> Result<Quota> {
        let stats = self.reservation_store.statistics().await?;
        let consumed = u32::try_from(stats.total - stats.released).unwrap_or(u32::MAX);
        let total = self.config.estimated_quota;
        Ok(Quota {
            total,
            consumed,
            remaining: total.saturating_sub(consumed),
        })
    }

    /// The acquire-vet-commit loop.
    ///
    /// # Errors
    /// Returns [`ProvisionError::QuotaExceeded`] immediately if the request
    /// would exceed the configured quota (step 1) — no partial attempt is
    /// made in that case.
    pub async fn reserve(
        &self,
        count: u32,
        location: Option<String>,
        mut shutdown: Option<tokio::sync::broadcast::Receiver<Signal>>,
    ) -> Result<ProvisionResult> {
        let quota = self.quota().await?;
        if quota.remaining < count {
            return Err(ProvisionError::QuotaExceeded);
        }

        let location = location.unwrap_or_else(|| self.config.default_location.clone());
        let max_attempts = count.saturating_mul(5);
        let mut result = ProvisionResult {
            success_count: 0,
            failure_count: 0,
            blacklisted_count: 0,
            reserved_ips: Vec::new(),
            attempts: 0,
        };

        while result.success_count < count && result.attempts < max_attempts {
            if let Some(rx) = shutdown.as_mut() {
                if rx.try_recv().is_ok() {
                    tracing::info!("provisioner reservation loop cancelled");
                    break;
                }
            }

            result.attempts += 1;
            let name = format!("reputation-engine-{}", ulid::Ulid::new());

            let block = match self.reserve_one_block(&location, &name).await {
                Ok(Some(block)) => block,
                Ok(None) => {
                    self.record_failed_attempt(None, "upstream returned an empty block")
                        .await;
                    result.failure_count += 1;
                    self.sleep_between_attempts().await;
                    continue;
                }
                Err(e) => {
                    self.record_failed_attempt(None, &e.to_string()).await;
                    result.failure_count += 1;
                    self.sleep_between_attempts().await;
                    continue;
                }
            };

            let Some(raw_ip) = block.ips.first() else {
                self.record_failed_attempt(Some(&block.id), "reserved block carried no IPs")
                    .await;
                result.failure_count += 1;
                self.sleep_between_attempts().await;
                continue;
            };

            let Ok(ip) = SendingIp::parse(raw_ip) else {
                self.record_failed_attempt(Some(&block.id), "upstream returned an unparsable IP")
                    .await;
                result.failure_count += 1;
                self.sleep_between_attempts().await;
                continue;
            };

            let (listed, probe_error) = match self.prober.probe(&ip).await {
                Ok(check) => (check.listed, None),
                Err(e) => (false, Some(e.to_string())),
            };

            if listed {
                if let Some(metrics) = reputation_metrics::try_metrics() {
                    metrics.reputation.record_reservation_attempt("deleted");
                }
                if let Err(e) = self.guarded_upstream(self.upstream.delete_block(&block.id)).await {
                    tracing::warn!(block_id = %block.id, error = %e, "failed to delete blacklisted block");
                }
                self.reservation_store
                    .record_attempt(ReservationAttempt {
                        id: 0,
                        provider_block_id: Some(block.id.clone()),
                        ip: Some(ip.clone()),
                        succeeded: false,
                        action_taken: Some(ActionTaken::Deleted),
                        error: probe_error,
                        attempted_at: Utc::now(),
                    })
                    .await?;
                result.blacklisted_count += 1;
                result.failure_count += 1;
            } else {
                if let Some(metrics) = reputation_metrics::try_metrics() {
                    metrics.reputation.record_reservation_attempt("kept");
                }
                let now = Utc::now();
                let reserved_ip = ReservedIp {
                    uid: ulid::Ulid::new(),
                    ip: ip.clone(),
                    provider_block_id: block.id.clone(),
                    datacenter_location: location.clone(),
                    status: ReservedIpStatus::Reserved,
                    is_blacklisted: false,
                    blacklist_details: std::collections::BTreeSet::new(),
                    reserved_at: now,
                    last_checked_at: now,
                    released_at: None,
                    assignee: None,
                    usage_counter: 0,
                    metadata: ahash::AHashMap::default(),
                    notes: probe_error.clone().unwrap_or_default(),
                };
                self.reservation_store.insert(reserved_ip.clone()).await?;
                self.reservation_store
                    .append_blacklist_history(BlacklistHistory {
                        id: 0,
                        reserved_ip_uid: reserved_ip.uid,
                        was_blacklisted: false,
                        zones: std::collections::BTreeSet::new(),
                        recorded_at: now,
                    })
                    .await?;
                self.reservation_store
                    .record_attempt(ReservationAttempt {
                        id: 0,
                        provider_block_id: Some(block.id.clone()),
                        ip: Some(ip),
                        succeeded: true,
                        action_taken: Some(ActionTaken::Kept),
                        error: probe_error,
                        attempted_at: now,
                    })
                    .await?;
                result.reserved_ips.push(reserved_ip);
                result.success_count += 1;
            }

            self.sleep_between_attempts().await;
        }

        Ok(result)
    }

    async fn reserve_one_block(
        &self,
        location: &str,
        name: &str,
    ) -> Result<Option<crate::upstream::UpstreamBlock>> {
        let block = self
            .guarded_upstream(self.upstream.reserve_block(location, 1, name))
            .await?;
        if !block.ips.is_empty() {
            return Ok(Some(block));
        }

        // step b: empty IP list gets one re-fetch after a short wait.
        tokio::time::sleep(Duration::from_secs(self.config.empty_block_retry_delay_secs)).await;
        let refetched = self
            .guarded_upstream(self.upstream.reserve_block(location, 1, name))
            .await?;
        Ok(if refetched.ips.is_empty() {
            None
        } else {
            Some(refetched)
        })
    }

    async fn record_failed_attempt(&self, block_id: Option<&str>, error: &str) {
        if let Some(metrics) = reputation_metrics::try_metrics() {
            metrics.reputation.record_reservation_attempt("failed");
        }
        let attempt = ReservationAttempt {
            id: 0,
            provider_block_id: block_id.map(ToString::to_string),
            ip: None,
            succeeded: false,
            action_taken: None,
            error: Some(error.to_string()),
            attempted_at: Utc::now(),
        };
        if let Err(e) = self.reservation_store.record_attempt(attempt).await {
            tracing::error!(error = %e, "failed to record a failed reservation attempt");
        }
    }

    async fn sleep_between_attempts(&self) {
        tokio::time::sleep(Duration::from_secs(self.config.inter_attempt_delay_secs)).await;
    }

    /// `CleanupSingleIPBlocks`: deletes
    /// upstream blocks of declared size 1 that are not referenced by any
    /// active `ReservedIp`, honoring the protected-block invariant — blocks
    /// whose declared size equals `config.protected_block_size` (11) are
    /// never deleted, regardless of database references.
    pub async fn cleanup_single_ip_blocks(&self) -> Result<CleanupResult> {
        let blocks = self.guarded_upstream(self.upstream.list_blocks()).await?;
        let referenced: HashSet<String> = self.reservation_store.referenced_block_ids().await?;
        let mut outcome = CleanupResult::default();

        for block in blocks {
            outcome.inspected += 1;

            if block.size == self.config.protected_block_size {
                outcome.protected += 1;
                continue;
            }

            if block.size != 1 || referenced.contains(&block.id) {
                outcome.retained += 1;
                continue;
            }

            match self.guarded_upstream(self.upstream.delete_block(&block.id)).await {
                Ok(()) => outcome.deleted += 1,
                Err(e) => {
                    tracing::warn!(block_id = %block.id, error = %e, "failed to delete unreferenced single-IP block");
                    outcome.retained += 1;
                }
            }

            tokio::time::sleep(Duration::from_millis(self.config.inter_delete_delay_millis)).await;
        }

        Ok(outcome)
    }

    /// `RecheckBlacklist(id)`.
    pub async fn recheck_blacklist(&self, uid: ulid::Ulid) -> Result<ReservedIp> {
        let reserved = self
            .reservation_store
            .get_by_uid(uid)
            .await?
            .ok_or(ProvisionError::NotFound)?;

        let check = self.prober.probe(&reserved.ip).await;
        let (is_blacklisted, zones) = match &check {
            Ok(result) => (result.listed, result.listings.clone()),
            Err(e) => {
                tracing::warn!(ip = %reserved.ip, error = %e, "recheck probe failed, treating as not listed");
                (false, std::collections::BTreeSet::new())
            }
        };

        self.reservation_store
            .update_blacklist_status(uid, is_blacklisted, zones.clone())
            .await?;
        self.reservation_store
            .append_blacklist_history(BlacklistHistory {
                id: 0,
                reserved_ip_uid: uid,
                was_blacklisted: is_blacklisted,
                zones,
                recorded_at: Utc::now(),
            })
            .await?;

        self.reservation_store
            .get_by_uid(uid)
            .await?
            .ok_or(ProvisionError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dashmap::DashMap;
    use reputation_dnsbl::DnsblConfig;
    use reputation_store::MemoryReservationStore;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Debug, Default)]
    struct FakeUpstream {
        blocks: DashMap<String, crate::upstream::UpstreamBlock>,
        next_id: AtomicU64,
        empty_once: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl UpstreamClient for FakeUpstream {
        async fn reserve_block(
            &self,
            location: &str,
            size: u32,
            _name: &str,
        ) -> std::result::Result<crate::upstream::UpstreamBlock, ProvisionError> {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let block_id = format!("block-{id}");
            let octet = u8::try_from(id % 250 + 1).unwrap_or(1);
            let block = crate::upstream::UpstreamBlock {
                id: block_id.clone(),
                ips: vec![format!("198.51.100.{octet}")],
                size,
                location: location.to_string(),
            };
            self.blocks.insert(block_id, block.clone());
            Ok(block)
        }

        async fn delete_block(&self, block_id: &str) -> std::result::Result<(), ProvisionError> {
            self.blocks.remove(block_id);
            Ok(())
        }

        async fn list_blocks(
            &self,
        ) -> std::result::Result<Vec<crate::upstream::UpstreamBlock>, ProvisionError> {
            Ok(self.blocks.iter().map(|e| e.value().clone()).collect())
        }
    }

    fn provisioner() -> Provisioner {
        Provisioner::new(
            Arc::new(MemoryReservationStore::new()),
            Arc::new(DnsblProber::new(DnsblConfig::default())),
            Arc::new(FakeUpstream::default()),
            ProvisionerConfig {
                inter_attempt_delay_secs: 0,
                inter_delete_delay_millis: 0,
                empty_block_retry_delay_secs: 0,
                ..ProvisionerConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn reserve_succeeds_up_to_requested_count() {
        let provisioner = provisioner();
        let result = provisioner.reserve(3, None, None).await.unwrap();
        assert_eq!(result.success_count, 3);
        assert_eq!(result.reserved_ips.len(), 3);
    }

    #[tokio::test]
    async fn reserve_rejects_when_quota_is_exceeded() {
        let provisioner = Provisioner::new(
            Arc::new(MemoryReservationStore::new()),
            Arc::new(DnsblProber::new(DnsblConfig::default())),
            Arc::new(FakeUpstream::default()),
            ProvisionerConfig {
                estimated_quota: 1,
                inter_attempt_delay_secs: 0,
                ..ProvisionerConfig::default()
            },
        );
        let result = provisioner.reserve(5, None, None).await;
        assert!(matches!(result, Err(ProvisionError::QuotaExceeded)));
    }

    #[tokio::test]
    async fn cleanup_never_deletes_protected_size_blocks() {
        let store = Arc::new(MemoryReservationStore::new());
        let upstream = Arc::new(FakeUpstream::default());
        upstream.blocks.insert(
            "protected-1".to_string(),
            crate::upstream::UpstreamBlock {
                id: "protected-1".to_string(),
                ips: vec!["198.51.100.200".to_string()],
                size: 11,
                location: "us-east".to_string(),
            },
        );
        upstream.blocks.insert(
            "orphan-1".to_string(),
            crate::upstream::UpstreamBlock {
                id: "orphan-1".to_string(),
                ips: vec!["198.51.100.201".to_string()],
                size: 1,
                location: "us-east".to_string(),
            },
        );

        let provisioner = Provisioner::new(
            store,
            Arc::new(DnsblProber::new(DnsblConfig::default())),
            upstream.clone(),
            ProvisionerConfig {
                inter_delete_delay_millis: 0,
                ..ProvisionerConfig::default()
            },
        );

        let outcome = provisioner.cleanup_single_ip_blocks().await.unwrap();
        assert_eq!(outcome.protected, 1);
        assert_eq!(outcome.deleted, 1);
        assert!(upstream.blocks.contains_key("protected-1"));
        assert!(!upstream.blocks.contains_key("orphan-1"));
    }

    #[tokio::test]
    async fn cleanup_retains_referenced_single_ip_blocks() {
        let store = Arc::new(MemoryReservationStore::new());
        let upstream = Arc::new(FakeUpstream::default());
        upstream.blocks.insert(
            "referenced-1".to_string(),
            crate::upstream::UpstreamBlock {
                id: "referenced-1".to_string(),
                ips: vec!["198.51.100.210".to_string()],
                size: 1,
                location: "us-east".to_string(),
            },
        );
        let now = Utc::now();
        store
            .insert(ReservedIp {
                uid: ulid::Ulid::new(),
                ip: SendingIp::parse("198.51.100.210").unwrap(),
                provider_block_id: "referenced-1".to_string(),
                datacenter_location: "us-east".to_string(),
                status: ReservedIpStatus::Reserved,
                is_blacklisted: false,
                blacklist_details: std::collections::BTreeSet::new(),
                reserved_at: now,
                last_checked_at: now,
                released_at: None,
                assignee: None,
                usage_counter: 0,
                metadata: ahash::AHashMap::default(),
                notes: String::new(),
            })
            .await
            .unwrap();

        let provisioner = Provisioner::new(
            store,
            Arc::new(DnsblProber::new(DnsblConfig::default())),
            upstream.clone(),
            ProvisionerConfig {
                inter_delete_delay_millis: 0,
                ..ProvisionerConfig::default()
            },
        );

        let outcome = provisioner.cleanup_single_ip_blocks().await.unwrap();
        assert_eq!(outcome.retained, 1);
        assert_eq!(outcome.deleted, 0);
        assert!(upstream.blocks.contains_key("referenced-1"));
    }
}
