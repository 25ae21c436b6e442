//! `GET /ips/{ip}/reputation`, `GET /ips/{ip}/failures`,
//! `GET /dashboard/ip-health`, `POST /ips/{ip}/quarantine`,
//! `POST /ips/{ip}/dnsbl-check`.

use std::{collections::BTreeMap, sync::Arc};

use ahash::AHashMap;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use reputation_common::{ReputationStatus, SendingIp};
use reputation_store::model::{ActionKind, DnsblCheck, FailureEvent, IpAction, ReputationState, TriggerSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{
    error::{parse_ip, ApiError, Result},
    state::AppState,
};

/// Parse a spec-style duration string (`"15m"`, `"1h"`, `"30s"`, `"2d"`).
/// Defaults to 15 minutes on an empty or missing input.
fn parse_window(raw: Option<&str>) -> Result<chrono::Duration> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Ok(chrono::Duration::minutes(15));
    };
    let (digits, unit) = raw.split_at(raw.len() - 1);
    let amount: i64 = digits
        .parse()
        .map_err(|_| ApiError::InvalidInput(format!("{raw:?} is not a valid window")))?;
    match unit {
        "s" => Ok(chrono::Duration::seconds(amount)),
        "m" => Ok(chrono::Duration::minutes(amount)),
        "h" => Ok(chrono::Duration::hours(amount)),
        "d" => Ok(chrono::Duration::days(amount)),
        _ => Err(ApiError::InvalidInput(format!(
            "{raw:?} is not a valid window (expected a suffix of s, m, h, or d)"
        ))),
    }
}

fn parse_status(raw: &str) -> Result<ReputationStatus> {
    match raw {
        "unknown" => Ok(ReputationStatus::Unknown),
        "healthy" => Ok(ReputationStatus::Healthy),
        "warning" => Ok(ReputationStatus::Warning),
        "quarantine" => Ok(ReputationStatus::Quarantine),
        "blacklisted" => Ok(ReputationStatus::Blacklisted),
        other => Err(ApiError::InvalidInput(format!(
            "{other:?} is not a known reputation status"
        ))),
    }
}

#[derive(Debug, Serialize)]
pub struct ReputationView {
    pub state: ReputationState,
    pub latest_dnsbl_check: Option<DnsblCheck>,
    pub recent_actions: Vec<IpAction>,
    pub summary: String,
    pub recommendations: &'static [&'static str],
}

fn summarize(state: &ReputationState) -> String {
    format!(
        "{} of {} sent rejected ({:.2}% ratio) across {} domain(s); status {}",
        state.total_rejected,
        state.total_sent,
        state.rejection_ratio * 100.0,
        state.unique_domains_rejected,
        state.status,
    )
}

/// `GET /ips/{ip}/reputation`.
pub async fn get_reputation(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Result<Json<ReputationView>> {
    let sending_ip = parse_ip(&ip)?;
    let reputation_state = state
        .reputation_store
        .get_state(&sending_ip)
        .await?
        .ok_or(ApiError::NotFound)?;
    let latest_dnsbl_check = state.dnsbl_check_store.latest_for_ip(&sending_ip).await?;
    let recent_actions = state
        .reputation_store
        .recent_actions(&sending_ip, state.recent_actions_limit)
        .await?;
    let summary = summarize(&reputation_state);
    let recommendations = reputation_state.status.recommendations();

    Ok(Json(ReputationView {
        state: reputation_state,
        latest_dnsbl_check,
        recent_actions,
        summary,
        recommendations,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FailuresQuery {
    pub window: Option<String>,
}

/// `GET /ips/{ip}/failures?window=<duration>`.
pub async fn list_failures(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
    Query(query): Query<FailuresQuery>,
) -> Result<Json<Vec<FailureEvent>>> {
    let sending_ip = parse_ip(&ip)?;
    let window = parse_window(query.window.as_deref())?;
    let since = Utc::now() - window;
    let failures = state
        .event_store
        .failures_by_ip_since(&sending_ip, since)
        .await?;
    Ok(Json(failures))
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardRollup {
    pub total: usize,
    pub counts_by_status: BTreeMap<&'static str, usize>,
    pub states: Vec<ReputationState>,
}

/// `GET /dashboard/ip-health?status=<filter>`.
pub async fn dashboard_ip_health(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardRollup>> {
    let all = state.reputation_store.list_states(None).await?;
    let mut counts_by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
    for entry in &all {
        *counts_by_status.entry(entry.status.as_str()).or_insert(0) += 1;
    }

    let states = match query.status.as_deref() {
        Some(raw) => {
            let wanted = parse_status(raw)?;
            all.into_iter().filter(|s| s.status == wanted).collect()
        }
        None => all,
    };

    Ok(Json(DashboardRollup {
        total: states.len(),
        counts_by_status,
        states,
    }))
}

/// `POST /ips/{ip}/quarantine`.
pub async fn quarantine_ip(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Result<Json<ReputationState>> {
    let sending_ip = parse_ip(&ip)?;
    let existing = state.reputation_store.get_state(&sending_ip).await?;
    let previous_status = existing
        .as_ref()
        .map_or(ReputationStatus::Unknown, |s| s.status);
    let now = Utc::now();

    let new_state = existing.map_or_else(
        || ReputationState {
            ip: sending_ip.clone(),
            window_start: now,
            window_end: now,
            total_sent: 0,
            total_rejected: 0,
            rejection_ratio: 0.0,
            unique_domains_rejected: 0,
            reason_counts: AHashMap::default(),
            major_providers_rejecting: BTreeSet::new(),
            status: ReputationStatus::Quarantine,
            last_updated: now,
            metadata: AHashMap::default(),
        },
        |mut s| {
            s.status = ReputationStatus::Quarantine;
            s.last_updated = now;
            s
        },
    );

    state.reputation_store.upsert_state(new_state.clone()).await?;
    state
        .reputation_store
        .append_action(IpAction {
            id: 0,
            ip: sending_ip.clone(),
            action: ActionKind::ManualQuarantine,
            previous_status: Some(previous_status),
            new_status: ReputationStatus::Quarantine,
            reason: "manual operator quarantine".to_string(),
            trigger: TriggerSource::Manual,
            metadata: AHashMap::default(),
            created_at: now,
        })
        .await?;

    dispatch_dnsbl_probe(&state, sending_ip);

    Ok(Json(new_state))
}

/// `POST /ips/{ip}/dnsbl-check`: a
/// synchronous probe, unlike the fire-and-forget dispatch the Aggregator and
/// manual quarantine use on a status transition.
pub async fn dnsbl_check(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Result<(StatusCode, Json<DnsblCheck>)> {
    let sending_ip = parse_ip(&ip)?;
    let check = state.prober.probe(&sending_ip).await?;
    state.dnsbl_check_store.record_check(check.clone()).await?;
    Ok((StatusCode::OK, Json(check)))
}

/// Fire-and-forget probe dispatch, mirroring
/// `reputation_aggregator::Aggregator`'s own dispatch on a status
/// transition — manual quarantine is itself a transition.
fn dispatch_dnsbl_probe(state: &Arc<AppState>, ip: SendingIp) {
    let prober = Arc::clone(&state.prober);
    let check_store = Arc::clone(&state.dnsbl_check_store);
    tokio::spawn(async move {
        match prober.probe(&ip).await {
            Ok(check) => {
                if let Err(e) = check_store.record_check(check).await {
                    tracing::error!(ip = %ip, error = %e, "failed to persist DNSBL check result");
                }
            }
            Err(e) => {
                tracing::warn!(ip = %ip, error = %e, "DNSBL probe triggered by manual quarantine failed");
            }
        }
    });
}
