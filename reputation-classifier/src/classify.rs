//! The decision algorithm itself. Pure: no I/O, no
//! logging, no metric emission.

use reputation_common::ReputationStatus;

use crate::{config::ClassifierConfig, snapshot::ClassifierSnapshot};

/// Evaluate `snapshot` against `config`, top-down, first match wins.
#[must_use]
pub fn classify(snapshot: &ClassifierSnapshot, config: &ClassifierConfig) -> ReputationStatus {
    // 1. Volume gate.
    if snapshot.total_sent < config.min_volume_for_assessment {
        return ReputationStatus::Healthy;
    }

    // 2. Blacklisted.
    let is_blacklisted = snapshot.rejection_ratio > config.blacklist_rejection_ratio
        && snapshot.unique_domains_rejected >= config.blacklist_min_domains
        && snapshot.major_providers.len() as u64 >= config.blacklist_min_major_providers
        && snapshot.has_reputation_codes();
    if is_blacklisted {
        return ReputationStatus::Blacklisted;
    }

    // 3. Quarantine.
    // The major-provider disjunct requires a PRIMARY/AUTH/INFRA-tier code
    // to have triggered; a POLICY-only signal (rate/policy codes only)
    // falls through to warning regardless of ratio.
    let quarantine_major_providers = snapshot.rejection_ratio > config.quarantine_rejection_ratio
        && !snapshot.major_providers.is_empty()
        && snapshot.has_non_policy_reputation_code();
    let quarantine_domain_spread = snapshot.rejection_ratio > config.blacklist_rejection_ratio
        && snapshot.unique_domains_rejected >= config.quarantine_min_domains;
    if quarantine_major_providers || quarantine_domain_spread {
        return ReputationStatus::Quarantine;
    }

    // 4. Warning.
    let warning_ratio = snapshot.rejection_ratio >= config.warning_rejection_ratio;
    let warning_throttle = snapshot.throttle_count > 10 && snapshot.total_rejected > 0;
    if warning_ratio || warning_throttle || snapshot.has_repeated_primary() {
        return ReputationStatus::Warning;
    }

    // 5. Default.
    ReputationStatus::Healthy
}

/// Human-readable issue-type categorization. Advisory only — does not affect `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    ContentSpamDetected,
    IpReputationDamage,
    AuthenticationFailure,
    InfrastructureMisconfiguration,
    PolicyViolation,
    ListHygieneIssue,
    RateLimiting,
    MixedIssues,
}

#[must_use]
pub fn categorize_issue(snapshot: &ClassifierSnapshot) -> IssueType {
    if snapshot.primary_spam_count() > 2 {
        return IssueType::ContentSpamDetected;
    }
    if snapshot.reason_counts.get("5.7.1").copied().unwrap_or(0) > 5 {
        return IssueType::IpReputationDamage;
    }
    if snapshot.auth_failure_count() > 5 {
        return IssueType::AuthenticationFailure;
    }
    if snapshot.infra_misconfiguration_count() > 5 {
        return IssueType::InfrastructureMisconfiguration;
    }
    if snapshot.policy_violation_count() > 10 {
        return IssueType::PolicyViolation;
    }
    if snapshot.list_hygiene_count() > 10 {
        return IssueType::ListHygieneIssue;
    }
    if snapshot.total_rejected > 0 && snapshot.throttle_count > snapshot.total_rejected / 2 {
        return IssueType::RateLimiting;
    }
    IssueType::MixedIssues
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn volume_gate_forces_healthy_below_threshold() {
        let config = ClassifierConfig::default();
        let snapshot = ClassifierSnapshot {
            total_sent: config.min_volume_for_assessment - 1,
            total_rejected: 1000,
            rejection_ratio: 1.0,
            unique_domains_rejected: 10,
            reason_counts: ahash::AHashMap::default(),
            domain_counts: ahash::AHashMap::default(),
            major_providers: ["gmail.com".to_string()].into_iter().collect(),
            throttle_count: 0,
        };
        assert_eq!(classify(&snapshot, &config), reputation_common::ReputationStatus::Healthy);
    }

    #[test]
    fn empty_failures_are_healthy_with_zero_ratio() {
        let config = ClassifierConfig::default();
        let snapshot = ClassifierSnapshot {
            total_sent: 0,
            total_rejected: 0,
            rejection_ratio: 0.0,
            unique_domains_rejected: 0,
            reason_counts: ahash::AHashMap::default(),
            domain_counts: ahash::AHashMap::default(),
            major_providers: Default::default(),
            throttle_count: 0,
        };
        assert_eq!(snapshot.rejection_ratio, 0.0);
        assert_eq!(classify(&snapshot, &config), reputation_common::ReputationStatus::Healthy);
    }
}
