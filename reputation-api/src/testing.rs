//! The testing surface: not part of the production API contract,
//! but a harness the test suite (and operators reproducing a scenario) drive
//! over HTTP rather than linking the classifier directly. `simulate-failures`
//! synthesizes failures with an explicit `total_sent`, which must reach the
//! Classifier unmodified — see
//! `reputation_aggregator::Aggregator::process_ip_with_total_sent`.

use std::sync::Arc;

use axum::{extract::{Path, State}, http::StatusCode, Json};
use chrono::Utc;
use reputation_common::{EnhancedCode, Fingerprint, RecipientDomain, ReputationStatus, SendingIp};
use reputation_store::model::FailureEvent;
use serde::{Deserialize, Serialize};

use crate::{
    error::{parse_ip, ApiError, Result},
    state::AppState,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatedFailure {
    pub code: String,
    pub domain: String,
    pub count: u32,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct SimulateFailuresRequest {
    pub ip: String,
    pub total_sent: u64,
    pub failures: Vec<SimulatedFailure>,
}

#[derive(Debug, Serialize)]
pub struct SimulateFailuresResponse {
    pub ip: String,
    pub synthesized_events: u32,
    pub previous_status: ReputationStatus,
    pub new_status: ReputationStatus,
    pub transitioned: bool,
}

/// Synthesize `Σ count` `FailureEvent`s one minute apart with distinct
/// synthetic fingerprints, then run an on-demand assessment for `ip` using
/// the supplied `total_sent`.
async fn run_simulation(
    state: &Arc<AppState>,
    request: &SimulateFailuresRequest,
) -> Result<SimulateFailuresResponse> {
    let sending_ip = parse_ip(&request.ip)?;
    let now = Utc::now();
    let mut synthesized = 0u32;

    for failure in &request.failures {
        let enhanced_code = failure
            .code
            .parse::<EnhancedCode>()
            .map_err(|_| ApiError::InvalidInput(format!("{:?} is not a valid enhanced code", failure.code)))?;
        let smtp_code = if enhanced_code.class == 4 { 450 } else { 550 };
        let recipient_domain = RecipientDomain::new(&failure.domain);

        for n in 0..failure.count {
            let occurred_at = now - chrono::Duration::minutes(i64::from(synthesized));
            synthesized += 1;
            state
                .event_store
                .record_failure(FailureEvent {
                    id: 0,
                    sending_ip: sending_ip.clone(),
                    recipient: format!("user@{}", failure.domain),
                    recipient_domain: recipient_domain.clone(),
                    smtp_code,
                    enhanced_code: Some(enhanced_code),
                    reason: failure.reason.clone(),
                    receiving_mx: format!("mx.{}", failure.domain),
                    occurred_at,
                    fingerprint: Fingerprint::new(format!(
                        "sim-{}-{}-{}-{n}",
                        request.ip, failure.code, failure.domain
                    )),
                    attempt_ordinal: 1,
                })
                .await?;
        }
    }

    // The synthesized timestamps span `synthesized` minutes into the past;
    // widen `since` by one extra minute so the oldest event is included.
    let since = now - chrono::Duration::minutes(i64::from(synthesized) + 1);
    let previous_status = state
        .reputation_store
        .get_state(&sending_ip)
        .await?
        .map_or(ReputationStatus::Unknown, |s| s.status);
    let outcome = state
        .aggregator
        .process_ip_with_total_sent(&sending_ip, since, request.total_sent)
        .await?;

    Ok(SimulateFailuresResponse {
        ip: request.ip.clone(),
        synthesized_events: synthesized,
        previous_status,
        new_status: outcome.new_status,
        transitioned: outcome.transitioned,
    })
}

/// `POST /testing/simulate-failures`.
pub async fn simulate_failures(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SimulateFailuresRequest>,
) -> Result<Json<SimulateFailuresResponse>> {
    let response = run_simulation(&state, &request).await?;
    Ok(Json(response))
}

#[derive(Debug, Clone, Serialize)]
pub struct TestCase {
    pub id: u32,
    pub ip: String,
    pub total_sent: u64,
    pub failures: Vec<SimulatedFailure>,
    pub expected_status: ReputationStatus,
}

fn failure(code: &str, domain: &str, count: u32) -> SimulatedFailure {
    SimulatedFailure {
        code: code.to_string(),
        domain: domain.to_string(),
        count,
        reason: String::new(),
    }
}

/// The fixed ≥15-scenario catalogue from spec.md seed-suite table,
/// verbatim.
#[must_use]
pub fn seed_test_cases() -> Vec<TestCase> {
    vec![
        TestCase {
            id: 1,
            ip: "203.0.113.10".to_string(),
            total_sent: 500,
            failures: vec![
                failure("5.1.1", "unknown-domain.com", 1),
                failure("4.2.2", "example.com", 1),
            ],
            expected_status: ReputationStatus::Healthy,
        },
        TestCase {
            id: 2,
            ip: "203.0.113.11".to_string(),
            total_sent: 300,
            failures: vec![
                failure("5.7.1", "gmail.com", 3),
                failure("5.7.1", "outlook.com", 2),
                failure("5.1.1", "various.com", 3),
            ],
            expected_status: ReputationStatus::Warning,
        },
        TestCase {
            id: 3,
            ip: "203.0.113.12".to_string(),
            total_sent: 400,
            failures: vec![
                failure("5.7.1", "gmail.com", 7),
                failure("5.7.1", "outlook.com", 5),
                failure("4.7.0", "yahoo.com", 3),
            ],
            expected_status: ReputationStatus::Quarantine,
        },
        TestCase {
            id: 4,
            ip: "203.0.113.13".to_string(),
            total_sent: 500,
            failures: vec![
                failure("5.7.1", "gmail.com", 12),
                failure("5.7.1", "outlook.com", 10),
                failure("5.7.1", "yahoo.com", 8),
                failure("5.7.1", "aol.com", 5),
            ],
            expected_status: ReputationStatus::Blacklisted,
        },
        TestCase {
            id: 5,
            ip: "203.0.113.14".to_string(),
            total_sent: 20,
            failures: vec![failure("5.7.1", "gmail.com", 2), failure("5.1.1", "example.com", 1)],
            expected_status: ReputationStatus::Healthy,
        },
        TestCase {
            id: 6,
            ip: "203.0.113.15".to_string(),
            total_sent: 600,
            failures: vec![
                failure("4.7.0", "gmail.com", 12),
                failure("4.2.1", "outlook.com", 4),
                failure("5.7.1", "yahoo.com", 2),
            ],
            expected_status: ReputationStatus::Warning,
        },
        TestCase {
            id: 7,
            ip: "203.0.113.16".to_string(),
            total_sent: 300,
            failures: vec![failure("5.7.23", "gmail.com", 15), failure("5.7.1", "outlook.com", 10)],
            expected_status: ReputationStatus::Quarantine,
        },
        TestCase {
            id: 8,
            ip: "203.0.113.17".to_string(),
            total_sent: 200,
            failures: vec![failure("5.7.25", "gmail.com", 8), failure("5.7.25", "outlook.com", 4)],
            expected_status: ReputationStatus::Quarantine,
        },
        TestCase {
            id: 9,
            ip: "203.0.113.18".to_string(),
            total_sent: 450,
            failures: vec![
                failure("5.1.1", "example1.com", 5),
                failure("5.7.1", "gmail.com", 3),
                failure("4.2.2", "example2.com", 3),
            ],
            expected_status: ReputationStatus::Warning,
        },
        TestCase {
            id: 10,
            ip: "203.0.113.19".to_string(),
            total_sent: 300,
            failures: vec![failure("5.1.1", "example.com", 3)],
            expected_status: ReputationStatus::Healthy,
        },
        TestCase {
            id: 11,
            ip: "203.0.113.20".to_string(),
            total_sent: 400,
            failures: vec![
                failure("5.7.606", "outlook.com", 8),
                failure("5.7.606", "hotmail.com", 6),
                failure("5.7.1", "live.com", 4),
            ],
            expected_status: ReputationStatus::Quarantine,
        },
        TestCase {
            id: 12,
            ip: "203.0.113.21".to_string(),
            total_sent: 350,
            failures: vec![
                failure("5.7.512", "gmail.com", 5),
                failure("5.7.512", "outlook.com", 4),
                failure("5.7.1", "yahoo.com", 3),
            ],
            expected_status: ReputationStatus::Quarantine,
        },
        TestCase {
            id: 13,
            ip: "203.0.113.22".to_string(),
            total_sent: 250,
            failures: vec![
                failure("5.7.27", "enterprise.com", 5),
                failure("5.7.7", "business.net", 4),
                failure("5.1.8", "corporate.org", 4),
            ],
            expected_status: ReputationStatus::Quarantine,
        },
        TestCase {
            id: 14,
            ip: "203.0.113.23".to_string(),
            total_sent: 300,
            failures: vec![failure("5.7.26", "gmail.com", 12), failure("5.7.26", "yahoo.com", 8)],
            expected_status: ReputationStatus::Quarantine,
        },
        TestCase {
            id: 15,
            ip: "203.0.113.24".to_string(),
            total_sent: 500,
            failures: vec![
                failure("4.7.1", "gmail.com", 8),
                failure("5.7.510", "outlook.com", 6),
                failure("5.4.1", "yahoo.com", 4),
            ],
            expected_status: ReputationStatus::Warning,
        },
    ]
}

/// `GET /testing/test-cases`.
pub async fn list_test_cases() -> Json<Vec<TestCase>> {
    Json(seed_test_cases())
}

#[derive(Debug, Serialize)]
pub struct TestCaseRunResult {
    pub id: u32,
    pub ip: String,
    pub expected: ReputationStatus,
    pub actual: ReputationStatus,
    pub passed: bool,
}

async fn run_case(state: &Arc<AppState>, case: &TestCase) -> Result<TestCaseRunResult> {
    let request = SimulateFailuresRequest {
        ip: case.ip.clone(),
        total_sent: case.total_sent,
        failures: case.failures.clone(),
    };
    let outcome = run_simulation(state, &request).await?;
    Ok(TestCaseRunResult {
        id: case.id,
        ip: case.ip.clone(),
        expected: case.expected_status,
        actual: outcome.new_status,
        passed: outcome.new_status == case.expected_status,
    })
}

/// `POST /testing/test-cases/{id}/run`.
pub async fn run_test_case(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<TestCaseRunResult>> {
    let case = seed_test_cases()
        .into_iter()
        .find(|c| c.id == id)
        .ok_or(ApiError::NotFound)?;
    let result = run_case(&state, &case).await?;
    Ok(Json(result))
}

#[derive(Debug, Serialize)]
pub struct TestSuiteRunResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub cases: Vec<TestCaseRunResult>,
}

/// `POST /testing/test-suite/run`.
pub async fn run_test_suite(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TestSuiteRunResult>> {
    let mut cases = Vec::new();
    for case in seed_test_cases() {
        cases.push(run_case(&state, &case).await?);
    }
    let passed = cases.iter().filter(|c| c.passed).count();
    let failed = cases.len() - passed;
    Ok(Json(TestSuiteRunResult {
        total: cases.len(),
        passed,
        failed,
        cases,
    }))
}

/// `GET /testing/health`: delegates to the process-wide
/// `HealthChecker` the same way `reputation-health`'s own readiness handler
/// does, so the test harness can poll one surface for both domain scenarios
/// and liveness.
pub async fn testing_health(State(state): State<Arc<AppState>>) -> impl axum::response::IntoResponse {
    let status = state.health_checker.get_status();
    let code = if status.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}
