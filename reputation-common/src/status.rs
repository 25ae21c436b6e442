use serde::{Deserialize, Serialize};

/// The four closed reputation tiers, plus the `unknown` sentinel used before
/// an IP has ever been observed by the Aggregator.
///
/// Ordering is monotonically increasing in severity: `Healthy <
/// Warning < Quarantine < Blacklisted`. `Unknown` sorts below `Healthy` but
/// is never itself a status transition target — see
/// [`ReputationStatus::is_transition_from`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReputationStatus {
    Unknown,
    Healthy,
    Warning,
    Quarantine,
    Blacklisted,
}

impl ReputationStatus {
    /// Numeric mapping for gauge metrics: `unknown` → 0, then 1..4.
    #[must_use]
    pub const fn as_gauge_value(self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Healthy => 1,
            Self::Warning => 2,
            Self::Quarantine => 3,
            Self::Blacklisted => 4,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Quarantine => "quarantine",
            Self::Blacklisted => "blacklisted",
        }
    }

    /// Recommended action tags for this status.
    #[must_use]
    pub const fn recommendations(self) -> &'static [&'static str] {
        match self {
            Self::Blacklisted => &[
                "immediate_quarantine",
                "swap_to_backup_ip",
                "run_dnsbl_checks",
                "alert_ops_critical",
                "investigate_root_cause",
            ],
            Self::Quarantine => &[
                "reduce_traffic_50_percent",
                "run_dnsbl_checks",
                "alert_ops_warning",
                "monitor_closely",
            ],
            Self::Warning => &[
                "monitor_closely",
                "reduce_send_rate",
                "check_email_list_hygiene",
            ],
            Self::Healthy | Self::Unknown => &["continue_normal_operations"],
        }
    }

    /// The first-ever observation of an IP (`prev = unknown`) must never be
    /// recorded as a `status_change`.
    #[must_use]
    pub fn is_transition_from(self, previous: Self) -> bool {
        !matches!(previous, Self::Unknown) && self != previous
    }
}

impl std::fmt::Display for ReputationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_spec_monotonicity() {
        assert!(ReputationStatus::Healthy < ReputationStatus::Warning);
        assert!(ReputationStatus::Warning < ReputationStatus::Quarantine);
        assert!(ReputationStatus::Quarantine < ReputationStatus::Blacklisted);
    }

    #[test]
    fn gauge_values_match_spec() {
        assert_eq!(ReputationStatus::Unknown.as_gauge_value(), 0);
        assert_eq!(ReputationStatus::Healthy.as_gauge_value(), 1);
        assert_eq!(ReputationStatus::Warning.as_gauge_value(), 2);
        assert_eq!(ReputationStatus::Quarantine.as_gauge_value(), 3);
        assert_eq!(ReputationStatus::Blacklisted.as_gauge_value(), 4);
    }

    #[test]
    fn first_observation_is_never_a_transition() {
        assert!(!ReputationStatus::Blacklisted.is_transition_from(ReputationStatus::Unknown));
    }

    #[test]
    fn same_status_is_not_a_transition() {
        assert!(!ReputationStatus::Warning.is_transition_from(ReputationStatus::Warning));
    }

    #[test]
    fn differing_known_statuses_are_a_transition() {
        assert!(ReputationStatus::Quarantine.is_transition_from(ReputationStatus::Warning));
    }
}
