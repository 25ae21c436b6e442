//! The derived snapshot the Classifier evaluates.

use std::collections::BTreeSet;

use ahash::AHashMap;
use reputation_common::providers::is_major_provider;
use reputation_store::model::FailureEvent;

use crate::config::TIERS;

/// A pure, immutable view over one IP's failures in the current window plus
/// an estimated sent count. Built once per Aggregator tick and handed to
/// [`crate::classify::classify`]; carries no handle back to storage.
#[derive(Debug, Clone)]
pub struct ClassifierSnapshot {
    pub total_sent: u64,
    pub total_rejected: u64,
    pub rejection_ratio: f64,
    pub unique_domains_rejected: u64,
    pub reason_counts: AHashMap<String, u64>,
    pub domain_counts: AHashMap<String, u64>,
    pub major_providers: BTreeSet<String>,
    pub throttle_count: u64,
}

impl ClassifierSnapshot {
    /// Build a snapshot from a window's failures and a sent-count estimate.
    /// `total_sent` is never re-derived from `failures` here; callers supply
    /// it.
    #[must_use]
    pub fn from_failures(failures: &[FailureEvent], total_sent: u64) -> Self {
        let total_rejected = failures.len() as u64;
        let rejection_ratio = if total_sent > 0 {
            total_rejected as f64 / total_sent as f64
        } else {
            0.0
        };

        let mut reason_counts: AHashMap<String, u64> = AHashMap::default();
        let mut domain_counts: AHashMap<String, u64> = AHashMap::default();
        let mut major_providers = BTreeSet::new();
        let mut throttle_count = 0u64;

        for failure in failures {
            if let Some(code) = &failure.enhanced_code {
                *reason_counts.entry(code.to_string()).or_insert(0) += 1;
                if code.class == 4 {
                    throttle_count += 1;
                }
            }
            let domain = failure.recipient_domain.as_str();
            *domain_counts.entry(domain.to_string()).or_insert(0) += 1;
            if is_major_provider(domain) {
                major_providers.insert(domain.to_string());
            }
        }

        Self {
            total_sent,
            total_rejected,
            rejection_ratio,
            unique_domains_rejected: domain_counts.len() as u64,
            reason_counts,
            domain_counts,
            major_providers,
            throttle_count,
        }
    }

    /// `has_reputation_codes`: at least one tiered code has triggered.
    #[must_use]
    pub fn has_reputation_codes(&self) -> bool {
        TIERS.iter().any(|tier| {
            tier.codes
                .iter()
                .any(|code| self.reason_counts.get(*code).copied().unwrap_or(0) >= tier.threshold)
        })
    }

    /// `has_repeated_primary`: `reason_counts["5.7.1"] >= 5`.
    #[must_use]
    pub fn has_repeated_primary(&self) -> bool {
        self.reason_counts.get("5.7.1").copied().unwrap_or(0) >= 5
    }

    /// Whether a PRIMARY/AUTH/INFRA-tier code has triggered — i.e. a
    /// reputation signal distinct from the POLICY tier's purely rate/policy
    /// codes (`4.7.0`, `4.7.1`, `5.7.510`).
    #[must_use]
    pub fn has_non_policy_reputation_code(&self) -> bool {
        TIERS
            .iter()
            .filter(|tier| tier.name != "POLICY")
            .any(|tier| {
                tier.codes
                    .iter()
                    .any(|code| self.reason_counts.get(*code).copied().unwrap_or(0) >= tier.threshold)
            })
    }

    fn sum_codes(&self, codes: &[&str]) -> u64 {
        codes
            .iter()
            .map(|code| self.reason_counts.get(*code).copied().unwrap_or(0))
            .sum()
    }

    /// The larger of the two individual content-spam code counts — the
    /// spec's `content_spam_detected` trigger is "any of" the two codes
    /// exceeding the threshold, not their sum.
    #[must_use]
    pub fn primary_spam_count(&self) -> u64 {
        ["5.7.512", "5.7.606"]
            .iter()
            .map(|code| self.reason_counts.get(*code).copied().unwrap_or(0))
            .max()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn auth_failure_count(&self) -> u64 {
        self.sum_codes(&["5.7.23", "5.7.26"])
    }

    #[must_use]
    pub fn infra_misconfiguration_count(&self) -> u64 {
        self.sum_codes(&["5.7.25", "5.7.27", "5.7.7", "5.1.8"])
    }

    #[must_use]
    pub fn policy_violation_count(&self) -> u64 {
        self.sum_codes(&["5.7.510", "4.7.1"])
    }

    #[must_use]
    pub fn list_hygiene_count(&self) -> u64 {
        self.reason_counts.get("5.1.1").copied().unwrap_or(0)
    }
}
