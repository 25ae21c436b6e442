//! The DNSBL Prober itself, built on `hickory_resolver`: the
//! query shape (reverse-octet name, A-record lookup) is the only thing that
//! differs from ordinary MX resolution.

use std::{collections::BTreeSet, net::IpAddr, sync::Arc, time::Duration};

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use hickory_resolver::{
    TokioResolver,
    config::{ResolverConfig, ResolverOpts},
};
use reputation_common::SendingIp;
use reputation_store::model::DnsblCheck;
use tokio::sync::Semaphore;

use crate::{config::DnsblConfig, error::DnsblError, severity::derive_severity};

/// Outcome of a single zone query, kept distinct from "errored" so that the
/// overwhelmingly common case (clean IP, NXDOMAIN on every zone) is never
/// confused with a genuine resolver failure.
enum ZoneOutcome {
    Listed,
    NotListed,
    Errored,
}

/// Fans out reverse-lookup queries across the configured zone list for one
/// or many sending IPs.
#[derive(Debug)]
pub struct DnsblProber {
    resolver: TokioResolver,
    config: DnsblConfig,
    batch_limiter: Arc<Semaphore>,
}

impl DnsblProber {
    #[must_use]
    pub fn new(config: DnsblConfig) -> Self {
        let resolver =
            TokioResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        let batch_limiter = Arc::new(Semaphore::new(config.max_concurrent_ip_probes));
        Self {
            resolver,
            config,
            batch_limiter,
        }
    }

    /// Probe a single IP across every configured zone with a shared deadline.
    ///
    /// # Errors
    /// Returns [`DnsblError::InvalidIp`] for IPv6 addresses and
    /// [`DnsblError::ProbeTimeout`] if every zone errored or timed out.
    pub async fn probe(&self, ip: &SendingIp) -> Result<DnsblCheck, DnsblError> {
        let IpAddr::V4(v4) = ip.to_ip_addr() else {
            return Err(DnsblError::InvalidIp(ip.to_string()));
        };

        let started = std::time::Instant::now();
        let per_zone_timeout = Duration::from_secs(self.config.per_zone_timeout_secs);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(self.config.total_timeout_secs);

        let octets = v4.octets();
        let reversed = format!("{}.{}.{}.{}", octets[3], octets[2], octets[1], octets[0]);

        let total_zones = self.config.zones.len();
        let mut pending: FuturesUnordered<_> = self
            .config
            .zones
            .iter()
            .map(|zone| {
                let query_name = format!("{reversed}.{zone}");
                let zone = zone.clone();
                let resolver = &self.resolver;
                async move {
                    let outcome = match tokio::time::timeout(
                        per_zone_timeout,
                        resolver.ipv4_lookup(query_name),
                    )
                    .await
                    {
                        Ok(Ok(lookup)) if lookup.iter().next().is_some() => ZoneOutcome::Listed,
                        Ok(Ok(_)) => ZoneOutcome::NotListed,
                        Ok(Err(err))
                            if matches!(
                                err.kind(),
                                hickory_resolver::error::ResolveErrorKind::NoRecordsFound { .. }
                            ) =>
                        {
                            ZoneOutcome::NotListed
                        }
                        Ok(Err(_)) | Err(_) => ZoneOutcome::Errored,
                    };
                    (zone, outcome)
                }
            })
            .collect();

        // Every completed zone is merged in; any still in flight when the
        // shared deadline fires is left pending and treated as not listed
        //.
        let mut listings: BTreeSet<String> = BTreeSet::new();
        let mut error_count = 0usize;
        loop {
            if pending.is_empty() {
                break;
            }
            tokio::select! {
                biased;
                next = pending.next() => {
                    let Some((zone, outcome)) = next else { break };
                    match outcome {
                        ZoneOutcome::Listed => {
                            if !self.config.ignore_zones.contains(&zone) {
                                listings.insert(zone);
                            }
                        }
                        ZoneOutcome::NotListed => {}
                        ZoneOutcome::Errored => error_count += 1,
                    }
                }
                () = tokio::time::sleep_until(deadline) => break,
            }
        }

        if total_zones > 0 && error_count == total_zones {
            return Err(DnsblError::ProbeTimeout);
        }

        let elapsed = started.elapsed();
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        if let Some(metrics) = reputation_metrics::try_metrics() {
            metrics.reputation.record_probe_duration(elapsed.as_secs_f64());
        }
        let severity = derive_severity(&listings);
        let listed = !listings.is_empty();

        Ok(DnsblCheck {
            id: 0,
            ip: ip.clone(),
            checked_at: Utc::now(),
            listed,
            listings,
            duration_ms,
            severity,
            metadata: ahash::AHashMap::default(),
        })
    }

    /// Probe many IPs, bounding total in-flight concurrent probes at
    /// `max_concurrent_ip_probes`.
    pub async fn probe_batch(&self, ips: &[SendingIp]) -> Vec<(SendingIp, Result<DnsblCheck, DnsblError>)> {
        let mut handles = Vec::with_capacity(ips.len());
        for ip in ips {
            let ip = ip.clone();
            let permit = Arc::clone(&self.batch_limiter);
            let result = async {
                let _permit = permit.acquire().await.expect("semaphore never closes");
                self.probe(&ip).await
            };
            handles.push(async move { (ip, result.await) });
        }
        futures::future::join_all(handles).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ipv6_is_rejected_before_any_network_activity() {
        let prober = DnsblProber::new(DnsblConfig::default());
        let ip = SendingIp::parse("2001:db8::1").unwrap();
        let result = prober.probe(&ip).await;
        assert!(matches!(result, Err(DnsblError::InvalidIp(_))));
    }
}
