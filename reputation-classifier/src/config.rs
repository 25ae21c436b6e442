//! Classifier configuration: a `Deserialize` struct with per-field
//! defaults and a handful of pure, side-effect-free helper methods.

use serde::{Deserialize, Serialize};

mod defaults {
    pub const fn window_minutes() -> u64 {
        15
    }
    pub const fn min_volume_for_assessment() -> u64 {
        50
    }
    pub const fn blacklist_rejection_ratio() -> f64 {
        0.05
    }
    pub const fn blacklist_min_domains() -> u64 {
        3
    }
    pub const fn blacklist_min_major_providers() -> u64 {
        2
    }
    pub const fn quarantine_rejection_ratio() -> f64 {
        0.03
    }
    pub const fn quarantine_min_domains() -> u64 {
        2
    }
    pub const fn warning_rejection_ratio() -> f64 {
        0.02
    }
}

/// Closed enumeration of thresholds driving the Classifier. Deserialized from the `[classifier]` section of the
/// process configuration; every field has a spec-mandated default so a bare
/// `[classifier]` section (or none at all) is valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    #[serde(default = "defaults::window_minutes")]
    pub window_minutes: u64,
    #[serde(default = "defaults::min_volume_for_assessment")]
    pub min_volume_for_assessment: u64,
    #[serde(default = "defaults::blacklist_rejection_ratio")]
    pub blacklist_rejection_ratio: f64,
    #[serde(default = "defaults::blacklist_min_domains")]
    pub blacklist_min_domains: u64,
    #[serde(default = "defaults::blacklist_min_major_providers")]
    pub blacklist_min_major_providers: u64,
    #[serde(default = "defaults::quarantine_rejection_ratio")]
    pub quarantine_rejection_ratio: f64,
    #[serde(default = "defaults::quarantine_min_domains")]
    pub quarantine_min_domains: u64,
    #[serde(default = "defaults::warning_rejection_ratio")]
    pub warning_rejection_ratio: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_minutes: defaults::window_minutes(),
            min_volume_for_assessment: defaults::min_volume_for_assessment(),
            blacklist_rejection_ratio: defaults::blacklist_rejection_ratio(),
            blacklist_min_domains: defaults::blacklist_min_domains(),
            blacklist_min_major_providers: defaults::blacklist_min_major_providers(),
            quarantine_rejection_ratio: defaults::quarantine_rejection_ratio(),
            quarantine_min_domains: defaults::quarantine_min_domains(),
            warning_rejection_ratio: defaults::warning_rejection_ratio(),
        }
    }
}

/// One reputation-code tier: a code "triggers"
/// when its occurrence count in the window reaches `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct Tier {
    pub name: &'static str,
    pub threshold: u64,
    pub codes: &'static [&'static str],
}

/// The closed, fixed tier table. Not part of `ClassifierConfig` because the
/// spec defines it as a fixed multiset, not an operator-tunable value —
/// "Polymorphism" calls for a fixed table rather than runtime configuration
/// here.
pub const TIERS: &[Tier] = &[
    Tier {
        name: "PRIMARY",
        threshold: 2,
        codes: &["5.7.1", "5.7.606", "5.7.512"],
    },
    Tier {
        name: "AUTH",
        threshold: 3,
        codes: &["5.7.23", "5.7.26"],
    },
    Tier {
        name: "INFRA",
        threshold: 3,
        codes: &["5.7.25", "5.7.27", "5.7.7", "5.1.8"],
    },
    Tier {
        name: "POLICY",
        threshold: 5,
        codes: &["4.7.0", "4.7.1", "5.7.510"],
    },
];
