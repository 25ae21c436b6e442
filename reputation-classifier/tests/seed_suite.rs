//! The fixed 15-case seed suite plus the universal property checks that
//! apply directly to the pure Classifier. Ingestion idempotence, transition
//! audit, and DNSBL ignore-list behavior are exercised in
//! `reputation-store`, `reputation-aggregator` and `reputation-dnsbl`
//! respectively, where the stateful machinery they describe actually lives.

use chrono::Utc;
use reputation_classifier::{classify, ClassifierConfig, ClassifierSnapshot};
use reputation_common::{EnhancedCode, RecipientDomain, ReputationStatus};
use reputation_store::model::FailureEvent;

fn synth_failures(ip: &str, failures: &[(&str, &str, u32)]) -> Vec<FailureEvent> {
    let mut events = Vec::new();
    let mut ordinal = 0u32;
    for (code, domain, count) in failures {
        for _ in 0..*count {
            ordinal += 1;
            events.push(FailureEvent {
                id: 0,
                sending_ip: reputation_common::SendingIp::parse(ip).unwrap(),
                recipient: format!("user@{domain}"),
                recipient_domain: RecipientDomain::new(*domain),
                smtp_code: 550,
                enhanced_code: code.parse::<EnhancedCode>().ok(),
                reason: "synthetic".into(),
                receiving_mx: format!("mx.{domain}"),
                occurred_at: Utc::now() - chrono::Duration::minutes(i64::from(ordinal)),
                fingerprint: format!("seed-{ip}-{code}-{domain}-{ordinal}").into(),
                attempt_ordinal: ordinal,
            });
        }
    }
    events
}

fn run_case(ip: &str, total_sent: u64, failures: &[(&str, &str, u32)]) -> ReputationStatus {
    let config = ClassifierConfig::default();
    let events = synth_failures(ip, failures);
    let snapshot = ClassifierSnapshot::from_failures(&events, total_sent);
    classify(&snapshot, &config)
}

#[test]
fn case_01_low_volume_benign_codes_are_healthy() {
    let status = run_case(
        "203.0.113.10",
        500,
        &[("5.1.1", "unknown-domain.com", 1), ("4.2.2", "example.com", 1)],
    );
    assert_eq!(status, ReputationStatus::Healthy);
}

#[test]
fn case_02_scattered_primary_codes_below_quarantine_is_warning() {
    let status = run_case(
        "203.0.113.11",
        300,
        &[
            ("5.7.1", "gmail.com", 3),
            ("5.7.1", "outlook.com", 2),
            ("5.1.1", "various.com", 3),
        ],
    );
    assert_eq!(status, ReputationStatus::Warning);
}

#[test]
fn case_03_heavy_primary_plus_policy_is_quarantine() {
    let status = run_case(
        "203.0.113.12",
        400,
        &[
            ("5.7.1", "gmail.com", 7),
            ("5.7.1", "outlook.com", 5),
            ("4.7.0", "yahoo.com", 3),
        ],
    );
    assert_eq!(status, ReputationStatus::Quarantine);
}

#[test]
fn case_04_severe_primary_across_many_providers_is_blacklisted() {
    let status = run_case(
        "203.0.113.13",
        500,
        &[
            ("5.7.1", "gmail.com", 12),
            ("5.7.1", "outlook.com", 10),
            ("5.7.1", "yahoo.com", 8),
            ("5.7.1", "aol.com", 5),
        ],
    );
    assert_eq!(status, ReputationStatus::Blacklisted);
}

#[test]
fn case_05_below_volume_floor_is_healthy() {
    let status = run_case(
        "203.0.113.14",
        20,
        &[("5.7.1", "gmail.com", 2), ("5.1.1", "example.com", 1)],
    );
    assert_eq!(status, ReputationStatus::Healthy);
}

#[test]
fn case_06_policy_heavy_with_light_primary_is_warning() {
    let status = run_case(
        "203.0.113.15",
        600,
        &[
            ("4.7.0", "gmail.com", 12),
            ("4.2.1", "outlook.com", 4),
            ("5.7.1", "yahoo.com", 2),
        ],
    );
    assert_eq!(status, ReputationStatus::Warning);
}

#[test]
fn case_07_auth_failures_plus_primary_is_quarantine() {
    let status = run_case(
        "203.0.113.16",
        300,
        &[("5.7.23", "gmail.com", 15), ("5.7.1", "outlook.com", 10)],
    );
    assert_eq!(status, ReputationStatus::Quarantine);
}

#[test]
fn case_08_infra_codes_across_two_providers_is_quarantine() {
    let status = run_case(
        "203.0.113.17",
        200,
        &[("5.7.25", "gmail.com", 8), ("5.7.25", "outlook.com", 4)],
    );
    assert_eq!(status, ReputationStatus::Quarantine);
}

#[test]
fn case_09_mixed_list_hygiene_and_light_primary_is_warning() {
    let status = run_case(
        "203.0.113.18",
        450,
        &[
            ("5.1.1", "example1.com", 5),
            ("5.7.1", "gmail.com", 3),
            ("4.2.2", "example2.com", 3),
        ],
    );
    assert_eq!(status, ReputationStatus::Warning);
}

#[test]
fn case_10_pure_list_hygiene_is_healthy() {
    let status = run_case("203.0.113.19", 300, &[("5.1.1", "example.com", 3)]);
    assert_eq!(status, ReputationStatus::Healthy);
}

#[test]
fn case_11_content_spam_codes_across_providers_is_quarantine() {
    let status = run_case(
        "203.0.113.20",
        400,
        &[
            ("5.7.606", "outlook.com", 8),
            ("5.7.606", "hotmail.com", 6),
            ("5.7.1", "live.com", 4),
        ],
    );
    assert_eq!(status, ReputationStatus::Quarantine);
}

#[test]
fn case_12_spam_detection_code_is_quarantine() {
    let status = run_case(
        "203.0.113.21",
        350,
        &[
            ("5.7.512", "gmail.com", 5),
            ("5.7.512", "outlook.com", 4),
            ("5.7.1", "yahoo.com", 3),
        ],
    );
    assert_eq!(status, ReputationStatus::Quarantine);
}

#[test]
fn case_13_infra_codes_across_three_domains_is_quarantine() {
    let status = run_case(
        "203.0.113.22",
        250,
        &[
            ("5.7.27", "enterprise.com", 5),
            ("5.7.7", "business.net", 4),
            ("5.1.8", "corporate.org", 4),
        ],
    );
    assert_eq!(status, ReputationStatus::Quarantine);
}

#[test]
fn case_14_auth_codes_across_two_major_providers_is_quarantine() {
    let status = run_case(
        "203.0.113.23",
        300,
        &[("5.7.26", "gmail.com", 12), ("5.7.26", "yahoo.com", 8)],
    );
    assert_eq!(status, ReputationStatus::Quarantine);
}

#[test]
fn case_15_policy_codes_across_providers_is_warning() {
    let status = run_case(
        "203.0.113.24",
        500,
        &[
            ("4.7.1", "gmail.com", 8),
            ("5.7.510", "outlook.com", 6),
            ("5.4.1", "yahoo.com", 4),
        ],
    );
    assert_eq!(status, ReputationStatus::Warning);
}

#[test]
fn p3_adding_more_reputation_coded_failures_never_improves_status() {
    let config = ClassifierConfig::default();
    let total_sent = 500;

    let fewer = synth_failures("203.0.113.30", &[("5.7.1", "gmail.com", 3)]);
    let more = synth_failures(
        "203.0.113.30",
        &[("5.7.1", "gmail.com", 3), ("5.7.1", "outlook.com", 10)],
    );

    let status_fewer = classify(
        &ClassifierSnapshot::from_failures(&fewer, total_sent),
        &config,
    );
    let status_more = classify(
        &ClassifierSnapshot::from_failures(&more, total_sent),
        &config,
    );
    assert!(status_more >= status_fewer);
}

#[test]
fn p4_volume_gate_holds_for_arbitrary_failure_load() {
    let config = ClassifierConfig::default();
    let failures = synth_failures(
        "203.0.113.31",
        &[("5.7.1", "gmail.com", 50), ("5.7.1", "outlook.com", 50)],
    );
    let snapshot =
        ClassifierSnapshot::from_failures(&failures, config.min_volume_for_assessment - 1);
    assert_eq!(classify(&snapshot, &config), ReputationStatus::Healthy);
}

#[test]
fn p2_classify_is_pure_and_deterministic() {
    let config = ClassifierConfig::default();
    let failures = synth_failures("203.0.113.32", &[("5.7.1", "gmail.com", 20)]);
    let snapshot = ClassifierSnapshot::from_failures(&failures, 500);
    assert_eq!(classify(&snapshot, &config), classify(&snapshot, &config));
}

#[test]
fn boundary_total_sent_one_below_floor_forces_healthy() {
    let config = ClassifierConfig::default();
    let failures = synth_failures(
        "203.0.113.33",
        &[
            ("5.7.1", "gmail.com", 12),
            ("5.7.1", "outlook.com", 10),
            ("5.7.1", "yahoo.com", 8),
        ],
    );
    let snapshot =
        ClassifierSnapshot::from_failures(&failures, config.min_volume_for_assessment - 1);
    assert_eq!(classify(&snapshot, &config), ReputationStatus::Healthy);
}

#[test]
fn boundary_empty_failures_has_zero_ratio() {
    let snapshot = ClassifierSnapshot::from_failures(&[], 500);
    assert_eq!(snapshot.rejection_ratio, 0.0);
    assert_eq!(
        classify(&snapshot, &ClassifierConfig::default()),
        ReputationStatus::Healthy
    );
}

#[test]
fn boundary_zero_total_sent_avoids_division_by_zero() {
    let failures = synth_failures("203.0.113.34", &[("5.7.1", "gmail.com", 5)]);
    let snapshot = ClassifierSnapshot::from_failures(&failures, 0);
    assert_eq!(snapshot.rejection_ratio, 0.0);
}
