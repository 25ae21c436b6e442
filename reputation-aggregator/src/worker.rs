//! The periodic Aggregator itself: a `tokio::time::interval`-driven
//! loop, an `AtomicBool` run-guard preventing overlapping ticks, `tokio::select!`
//! multiplexing the ticker against the shutdown broadcast, and a
//! drain-in-flight-then-exit shutdown.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use ahash::AHashMap;
use chrono::Utc;
use reputation_classifier::{ClassifierSnapshot, classify, estimate_sent};
use reputation_common::{ReputationStatus, Signal};
use reputation_dnsbl::DnsblProber;
use reputation_store::{
    DnsblCheckStore, EventStore, ReputationStore,
    model::{ActionKind, IpAction, ReputationState, TriggerSource},
};

use crate::{config::AggregatorConfig, error::Result};

/// Per-tick outcome counters.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct TickSummary {
    pub ips_processed: u64,
    pub errors: u64,
    pub transitions: u64,
    pub duration_ms: u64,
}

/// What happened to a single IP during a tick.
#[derive(Debug, Clone)]
pub struct IpOutcome {
    pub ip: reputation_common::SendingIp,
    pub previous_status: ReputationStatus,
    pub new_status: ReputationStatus,
    pub transitioned: bool,
}

/// C4: the periodic worker that folds raw events into per-IP rolling-window
/// state using the Classifier, and commits state transitions with audit
/// entries.
pub struct Aggregator {
    event_store: Arc<dyn EventStore>,
    reputation_store: Arc<dyn ReputationStore>,
    dnsbl_check_store: Arc<dyn DnsblCheckStore>,
    prober: Arc<DnsblProber>,
    config: AggregatorConfig,
    /// Prevents two ticks from running concurrently.
    tick_running: AtomicBool,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        event_store: Arc<dyn EventStore>,
        reputation_store: Arc<dyn ReputationStore>,
        dnsbl_check_store: Arc<dyn DnsblCheckStore>,
        prober: Arc<DnsblProber>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            event_store,
            reputation_store,
            dnsbl_check_store,
            prober,
            config,
            tick_running: AtomicBool::new(false),
        }
    }

    /// Run the Aggregator until a shutdown signal arrives.
    ///
    /// An immediate run fires at startup, then the ticker takes over. On
    /// shutdown, the in-flight tick (if any) is allowed to drain before
    /// returning.
    pub async fn serve(self: Arc<Self>, mut shutdown: tokio::sync::broadcast::Receiver<Signal>) {
        tracing::info!("reputation aggregator starting");

        match self.run_once().await {
            Ok(summary) => tracing::info!(
                ips_processed = summary.ips_processed,
                errors = summary.errors,
                transitions = summary.transitions,
                duration_ms = summary.duration_ms,
                "initial aggregation tick complete"
            ),
            Err(e) => tracing::error!(error = %e, "initial aggregation tick failed"),
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(
            self.config.aggregation_interval_secs,
        ));
        ticker.tick().await; // first tick already consumed by the immediate run above

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(summary) => tracing::info!(
                            ips_processed = summary.ips_processed,
                            errors = summary.errors,
                            transitions = summary.transitions,
                            duration_ms = summary.duration_ms,
                            "aggregation tick complete"
                        ),
                        Err(e) => tracing::error!(error = %e, "aggregation tick failed"),
                    }
                }
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown | Signal::Finalised) | Err(_) => {
                            tracing::info!("reputation aggregator received shutdown signal");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("reputation aggregator shutdown complete");
    }

    /// Run a single full tick. Returns
    /// [`AggregatorError::AlreadyRunning`] if another tick is already
    /// in-flight (the run-guard).
    pub async fn run_once(&self) -> Result<TickSummary> {
        if self
            .tick_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(crate::error::AggregatorError::AlreadyRunning);
        }

        let started = std::time::Instant::now();
        let mut summary = TickSummary::default();

        let since = Utc::now() - chrono::Duration::minutes(i64::try_from(self.config.classifier.window_minutes).unwrap_or(15));
        let candidates = match self.event_store.ips_with_activity_since(since).await {
            Ok(ips) => ips,
            Err(e) => {
                self.tick_running.store(false, Ordering::Release);
                return Err(e.into());
            }
        };

        for ip in candidates {
            // "Failure semantics": an error on one IP must not abort
            // the tick; it is recorded and the next IP proceeds.
            match self.process_ip(&ip, since).await {
                Ok(outcome) => {
                    summary.ips_processed += 1;
                    if let Some(metrics) = reputation_metrics::try_metrics() {
                        metrics.reputation.set_ip_status(outcome.ip.as_str(), outcome.new_status);
                    }
                    if outcome.transitioned {
                        summary.transitions += 1;
                        if let Some(metrics) = reputation_metrics::try_metrics() {
                            metrics.reputation.record_status_transition(outcome.new_status);
                        }
                        self.dispatch_dnsbl_probe(outcome.ip.clone());
                    }
                }
                Err(e) => {
                    summary.errors += 1;
                    tracing::error!(ip = %ip, error = %e, "error computing reputation state for IP");
                }
            }
        }

        summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        if let Some(metrics) = reputation_metrics::try_metrics() {
            metrics.reputation.record_tick_duration(started.elapsed().as_secs_f64());
        }
        self.tick_running.store(false, Ordering::Release);
        Ok(summary)
    }

    /// Process a single IP through steps 3a-3g of, estimating
    /// `total_sent` the way a regular tick does. Exposed separately so
    /// manual operator triggers can run an on-demand assessment for one IP
    /// without taking the whole-tick run-guard.
    pub async fn process_ip(
        &self,
        ip: &reputation_common::SendingIp,
        since: chrono::DateTime<Utc>,
    ) -> Result<IpOutcome> {
        let events = self.event_store.failures_by_ip_since(ip, since).await?;
        let sent_estimate = estimate_sent(events.len() as u64, &self.config.classifier);
        self.assess(ip, since, sent_estimate).await
    }

    /// Process a single IP with an operator-supplied `total_sent`, bypassing
    /// `EstimateSent` entirely.
    pub async fn process_ip_with_total_sent(
        &self,
        ip: &reputation_common::SendingIp,
        since: chrono::DateTime<Utc>,
        total_sent: u64,
    ) -> Result<IpOutcome> {
        self.assess(ip, since, total_sent).await
    }

    async fn assess(
        &self,
        ip: &reputation_common::SendingIp,
        since: chrono::DateTime<Utc>,
        total_sent: u64,
    ) -> Result<IpOutcome> {
        let previous_status = self
            .reputation_store
            .get_state(ip)
            .await?
            .map_or(ReputationStatus::Unknown, |state| state.status);

        let events = self.event_store.failures_by_ip_since(ip, since).await?;
        let snapshot = ClassifierSnapshot::from_failures(&events, total_sent);
        let new_status = classify(&snapshot, &self.config.classifier);
        let now = Utc::now();

        self.reputation_store
            .upsert_state(ReputationState {
                ip: ip.clone(),
                window_start: since,
                window_end: now,
                total_sent: snapshot.total_sent,
                total_rejected: snapshot.total_rejected,
                rejection_ratio: snapshot.rejection_ratio,
                unique_domains_rejected: snapshot.unique_domains_rejected,
                reason_counts: snapshot.reason_counts.clone(),
                major_providers_rejecting: snapshot.major_providers.clone(),
                status: new_status,
                last_updated: now,
                metadata: AHashMap::default(),
            })
            .await?;

        let transitioned = new_status.is_transition_from(previous_status);
        if transitioned {
            self.reputation_store
                .append_action(IpAction {
                    id: 0,
                    ip: ip.clone(),
                    action: ActionKind::StatusChange,
                    previous_status: Some(previous_status),
                    new_status,
                    reason: summarize(&snapshot),
                    trigger: TriggerSource::Automated,
                    metadata: AHashMap::default(),
                    created_at: now,
                })
                .await?;
        }

        Ok(IpOutcome {
            ip: ip.clone(),
            previous_status,
            new_status,
            transitioned,
        })
    }

    /// Fire-and-forget DNSBL probe dispatch. Probe failure
    /// never fails the tick — it is only logged.
    fn dispatch_dnsbl_probe(&self, ip: reputation_common::SendingIp) {
        let prober = Arc::clone(&self.prober);
        let check_store = Arc::clone(&self.dnsbl_check_store);
        tokio::spawn(async move {
            match prober.probe(&ip).await {
                Ok(check) => {
                    if let Err(e) = check_store.record_check(check).await {
                        tracing::error!(ip = %ip, error = %e, "failed to persist DNSBL check result");
                    }
                }
                Err(e) => {
                    tracing::warn!(ip = %ip, error = %e, "DNSBL probe triggered by status change failed");
                }
            }
        });
    }
}

/// A short human-readable summary of the snapshot that triggered a
/// transition, used as the `reason` text on the `IpAction` audit entry.
fn summarize(snapshot: &ClassifierSnapshot) -> String {
    format!(
        "rejection_ratio={:.4} unique_domains_rejected={} major_providers={} total_rejected={}",
        snapshot.rejection_ratio,
        snapshot.unique_domains_rejected,
        snapshot.major_providers.len(),
        snapshot.total_rejected,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reputation_common::{EnhancedCode, RecipientDomain, SendingIp};
    use reputation_dnsbl::DnsblConfig;
    use reputation_store::{
        MemoryDnsblCheckStore, MemoryEventStore, MemoryReputationStore, model::FailureEvent,
    };

    fn aggregator() -> Aggregator {
        Aggregator::new(
            Arc::new(MemoryEventStore::new()),
            Arc::new(MemoryReputationStore::new()),
            Arc::new(MemoryDnsblCheckStore::new()),
            Arc::new(DnsblProber::new(DnsblConfig::default())),
            AggregatorConfig::default(),
        )
    }

    async fn seed_failures(aggregator: &Aggregator, ip: &str, count: u32) {
        for n in 0..count {
            aggregator
                .event_store
                .record_failure(FailureEvent {
                    id: 0,
                    sending_ip: SendingIp::parse(ip).unwrap(),
                    recipient: format!("user{n}@gmail.com"),
                    recipient_domain: RecipientDomain::new("gmail.com"),
                    smtp_code: 550,
                    enhanced_code: "5.7.1".parse::<EnhancedCode>().ok(),
                    reason: "blocked".into(),
                    receiving_mx: "mx.gmail.com".into(),
                    occurred_at: Utc::now(),
                    fingerprint: format!("fp-{ip}-{n}").into(),
                    attempt_ordinal: 1,
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn first_observation_never_emits_a_transition() {
        let agg = aggregator();
        let ip = "203.0.113.13";
        seed_failures(&agg, ip, 12).await;

        let since = Utc::now() - chrono::Duration::minutes(15);
        let outcome = agg
            .process_ip(&SendingIp::parse(ip).unwrap(), since)
            .await
            .unwrap();

        assert!(!outcome.transitioned);
        assert_eq!(
            agg.reputation_store
                .recent_actions(&SendingIp::parse(ip).unwrap(), 10)
                .await
                .unwrap()
                .len(),
            0
        );
    }

    #[tokio::test]
    async fn subsequent_status_change_emits_a_transition_action() {
        let agg = aggregator();
        let ip = SendingIp::parse("203.0.113.14").unwrap();
        let since = Utc::now() - chrono::Duration::minutes(15);

        // First observation: healthy (no events yet).
        agg.process_ip(&ip, since).await.unwrap();

        // Now seed enough reputation-code hits to force blacklisted.
        seed_failures(&agg, "203.0.113.14", 12).await;
        let outcome = agg.process_ip(&ip, since).await.unwrap();

        assert!(outcome.transitioned);
        let actions = agg.reputation_store.recent_actions(&ip, 10).await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].new_status, outcome.new_status);
    }

    #[tokio::test]
    async fn run_once_rejects_concurrent_ticks() {
        let agg = Arc::new(aggregator());
        agg.tick_running.store(true, Ordering::Release);
        let result = agg.run_once().await;
        assert!(matches!(
            result,
            Err(crate::error::AggregatorError::AlreadyRunning)
        ));
    }

    #[tokio::test]
    async fn errors_on_one_ip_do_not_abort_the_tick() {
        let agg = aggregator();
        seed_failures(&agg, "203.0.113.15", 3).await;
        seed_failures(&agg, "203.0.113.16", 3).await;

        let summary = agg.run_once().await.unwrap();
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.ips_processed, 2);
    }
}
