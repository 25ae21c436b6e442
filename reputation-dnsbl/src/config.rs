//! DNSBL prober configuration: a `Deserialize` struct with
//! per-field defaults.

use serde::{Deserialize, Serialize};

mod defaults {
    pub const fn per_zone_timeout_secs() -> u64 {
        2
    }
    pub const fn total_timeout_secs() -> u64 {
        5
    }
    pub const fn max_concurrent_ip_probes() -> usize {
        16
    }

    pub fn zones() -> Vec<String> {
        [
            "zen.spamhaus.org",
            "b.barracudacentral.org",
            "bl.spamcop.net",
            "cbl.abuseat.org",
            "dnsbl.sorbs.net",
            "dnsbl.rv-soft.com", // SURRIEL
            "spam.dnsbl.sorbs.net",
            "all.spamrats.com",
            "rbl.spamrats.com",
            "dyna.spamrats.com",
            "ix.dnsbl.manitu.net",
            "ubl.unsubscore.com",
            "dronebl.org",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    pub fn ignore_zones() -> Vec<String> {
        [
            "dnsbl-1.uceprotect.net",
            "dnsbl-2.uceprotect.net",
            "dnsbl-3.uceprotect.net",
            "ips.backscatterer.org",
            "dnsbl.invaluement.com",
            "ivmsip.invaluement.com",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

/// DNSBL prober configuration. The zone list and ignore list are
/// operator-configurable; the defaults here are a curated set of
/// well-known public zones and a hostname-based ignore list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsblConfig {
    #[serde(default = "defaults::zones")]
    pub zones: Vec<String>,
    #[serde(default = "defaults::ignore_zones")]
    pub ignore_zones: Vec<String>,
    #[serde(default = "defaults::per_zone_timeout_secs")]
    pub per_zone_timeout_secs: u64,
    #[serde(default = "defaults::total_timeout_secs")]
    pub total_timeout_secs: u64,
    /// Bound on concurrent in-flight IP probes for a batch.
    #[serde(default = "defaults::max_concurrent_ip_probes")]
    pub max_concurrent_ip_probes: usize,
}

impl Default for DnsblConfig {
    fn default() -> Self {
        Self {
            zones: defaults::zones(),
            ignore_zones: defaults::ignore_zones(),
            per_zone_timeout_secs: defaults::per_zone_timeout_secs(),
            total_timeout_secs: defaults::total_timeout_secs(),
            max_concurrent_ip_probes: defaults::max_concurrent_ip_probes(),
        }
    }
}
