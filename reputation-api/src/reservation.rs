//! The reservation surface: provisioning, inventory listing,
//! lifecycle updates, quota, and cleanup.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use reputation_provisioner::{CleanupResult, ProvisionResult, Quota};
use reputation_store::{
    model::{ReservedIp, ReservedIpStatus},
    ReservationStatistics, ReservedIpFilter,
};
use serde::Deserialize;

use crate::{
    error::{parse_uid, ApiError, Result},
    state::AppState,
};

fn parse_reserved_status(raw: &str) -> Result<ReservedIpStatus> {
    match raw {
        "reserved" => Ok(ReservedIpStatus::Reserved),
        "in_use" => Ok(ReservedIpStatus::InUse),
        "released" => Ok(ReservedIpStatus::Released),
        "quarantined" => Ok(ReservedIpStatus::Quarantined),
        other => Err(ApiError::InvalidInput(format!(
            "{other:?} is not a known reserved-IP status"
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub count: u32,
    pub location: Option<String>,
}

/// `POST /ips/reserve`.
pub async fn reserve_ips(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<ProvisionResult>)> {
    if request.count == 0 {
        return Err(ApiError::InvalidInput(
            "count must be at least 1".to_string(),
        ));
    }
    let result = state
        .provisioner
        .reserve(request.count, request.location, None)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(Debug, Deserialize)]
pub struct ListReservedQuery {
    pub status: Option<String>,
    pub blacklisted: Option<bool>,
    pub location: Option<String>,
}

/// `GET /ips/reserved?status&blacklisted&location`.
pub async fn list_reserved(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListReservedQuery>,
) -> Result<Json<Vec<ReservedIp>>> {
    let status = query.status.as_deref().map(parse_reserved_status).transpose()?;
    let filter = ReservedIpFilter {
        status,
        blacklisted: query.blacklisted,
        location: query.location,
    };
    let reserved = state.reservation_store.list_reserved(filter).await?;
    Ok(Json(reserved))
}

/// `GET /ips/reserved/{id}`.
pub async fn get_reserved(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReservedIp>> {
    let uid = parse_uid(&id)?;
    let reserved = state
        .reservation_store
        .get_by_uid(uid)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(reserved))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// `PUT /ips/reserved/{id}/status`.
pub async fn update_reserved_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ReservedIp>> {
    let uid = parse_uid(&id)?;
    let new_status = parse_reserved_status(&request.status)?;
    let mut reserved = state
        .reservation_store
        .get_by_uid(uid)
        .await?
        .ok_or(ApiError::NotFound)?;

    reserved.status = new_status;
    if matches!(new_status, ReservedIpStatus::Released) {
        reserved.released_at = Some(chrono::Utc::now());
    }
    state.reservation_store.update(reserved.clone()).await?;
    Ok(Json(reserved))
}

/// `POST /ips/reserved/{id}/recheck`.
pub async fn recheck_reserved(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReservedIp>> {
    let uid = parse_uid(&id)?;
    let reserved = state.provisioner.recheck_blacklist(uid).await?;
    Ok(Json(reserved))
}

/// `DELETE /ips/reserved/{id}`.
pub async fn delete_reserved(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let uid = parse_uid(&id)?;
    state.reservation_store.delete(uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /ips/quota`.
pub async fn get_quota(State(state): State<Arc<AppState>>) -> Result<Json<Quota>> {
    let quota = state.provisioner.quota().await?;
    Ok(Json(quota))
}

/// `POST /ips/cleanup`.
pub async fn run_cleanup(State(state): State<Arc<AppState>>) -> Result<Json<CleanupResult>> {
    let outcome = state.provisioner.cleanup_single_ip_blocks().await?;
    Ok(Json(outcome))
}

/// `GET /ips/statistics`.
pub async fn get_statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReservationStatistics>> {
    let stats = state.reservation_store.statistics().await?;
    Ok(Json(stats))
}
