use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use reputation_common::SendingIp;
use sqlx::Row;

use crate::{
    error::Result,
    model::{ActionTaken, BlacklistHistory, ReservationAttempt, ReservedIp, ReservedIpStatus},
    reservation_store::{ReservationStatistics, ReservationStore, ReservedIpFilter},
};

use super::PgStore;

fn status_to_str(status: ReservedIpStatus) -> &'static str {
    match status {
        ReservedIpStatus::Reserved => "reserved",
        ReservedIpStatus::InUse => "in_use",
        ReservedIpStatus::Released => "released",
        ReservedIpStatus::Quarantined => "quarantined",
    }
}

fn status_from_str(raw: &str) -> ReservedIpStatus {
    match raw {
        "in_use" => ReservedIpStatus::InUse,
        "released" => ReservedIpStatus::Released,
        "quarantined" => ReservedIpStatus::Quarantined,
        _ => ReservedIpStatus::Reserved,
    }
}

fn action_taken_to_str(action: ActionTaken) -> &'static str {
    match action {
        ActionTaken::Kept => "kept",
        ActionTaken::Deleted => "deleted",
        ActionTaken::Quarantined => "quarantined",
        ActionTaken::KeptButNotStored => "kept_but_not_stored",
    }
}

fn action_taken_from_str(raw: &str) -> ActionTaken {
    match raw {
        "deleted" => ActionTaken::Deleted,
        "quarantined" => ActionTaken::Quarantined,
        "kept_but_not_stored" => ActionTaken::KeptButNotStored,
        _ => ActionTaken::Kept,
    }
}

fn row_to_reserved(row: sqlx::postgres::PgRow) -> Result<ReservedIp> {
    let uid: uuid::Uuid = row.get("uid");
    let ip: String = row.get("ip");
    let status: String = row.get("status");
    let blacklist_details: serde_json::Value = row.get("blacklist_details");
    let usage_counter: i64 = row.get("usage_counter");
    let metadata: serde_json::Value = row.get("metadata");

    Ok(ReservedIp {
        uid: ulid::Ulid::from_bytes(*uid.as_bytes()),
        ip: SendingIp::parse(&ip).map_err(|_| crate::error::StoreError::InvalidInput("ip".into()))?,
        provider_block_id: row.get("provider_block_id"),
        datacenter_location: row.get("datacenter_location"),
        status: status_from_str(&status),
        is_blacklisted: row.get("is_blacklisted"),
        blacklist_details: serde_json::from_value(blacklist_details).unwrap_or_default(),
        reserved_at: row.get("reserved_at"),
        last_checked_at: row.get("last_checked_at"),
        released_at: row.get("released_at"),
        assignee: row.get("assignee"),
        usage_counter: u64::try_from(usage_counter).unwrap_or_default(),
        metadata: serde_json::from_value(metadata).unwrap_or_default(),
        notes: row.get("notes"),
    })
}

fn ulid_to_uuid(uid: ulid::Ulid) -> uuid::Uuid {
    uuid::Uuid::from_bytes(uid.to_bytes())
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn get_by_uid(&self, uid: ulid::Ulid) -> Result<Option<ReservedIp>> {
        let row = sqlx::query("SELECT * FROM reserved_ips WHERE uid = $1")
            .bind(ulid_to_uuid(uid))
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_reserved).transpose()
    }

    async fn get_by_ip(&self, ip: &SendingIp) -> Result<Option<ReservedIp>> {
        let row = sqlx::query("SELECT * FROM reserved_ips WHERE ip = $1")
            .bind(ip.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_reserved).transpose()
    }

    async fn insert(&self, reserved: ReservedIp) -> Result<()> {
        let blacklist_details = serde_json::to_value(&reserved.blacklist_details)
            .map_err(|e| crate::error::StoreError::InvalidInput(e.to_string()))?;
        let metadata = serde_json::to_value(&reserved.metadata)
            .map_err(|e| crate::error::StoreError::InvalidInput(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO reserved_ips
                (uid, ip, provider_block_id, datacenter_location, status, is_blacklisted,
                 blacklist_details, reserved_at, last_checked_at, released_at, assignee,
                 usage_counter, metadata, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(ulid_to_uuid(reserved.uid))
        .bind(reserved.ip.as_str())
        .bind(&reserved.provider_block_id)
        .bind(&reserved.datacenter_location)
        .bind(status_to_str(reserved.status))
        .bind(reserved.is_blacklisted)
        .bind(blacklist_details)
        .bind(reserved.reserved_at)
        .bind(reserved.last_checked_at)
        .bind(reserved.released_at)
        .bind(&reserved.assignee)
        .bind(i64::try_from(reserved.usage_counter).unwrap_or(i64::MAX))
        .bind(metadata)
        .bind(&reserved.notes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, reserved: ReservedIp) -> Result<()> {
        let blacklist_details = serde_json::to_value(&reserved.blacklist_details)
            .map_err(|e| crate::error::StoreError::InvalidInput(e.to_string()))?;
        let metadata = serde_json::to_value(&reserved.metadata)
            .map_err(|e| crate::error::StoreError::InvalidInput(e.to_string()))?;

        let result = sqlx::query(
            r"
            UPDATE reserved_ips SET
                status = $2, is_blacklisted = $3, blacklist_details = $4, last_checked_at = $5,
                released_at = $6, assignee = $7, usage_counter = $8, metadata = $9, notes = $10
            WHERE uid = $1
            ",
        )
        .bind(ulid_to_uuid(reserved.uid))
        .bind(status_to_str(reserved.status))
        .bind(reserved.is_blacklisted)
        .bind(blacklist_details)
        .bind(reserved.last_checked_at)
        .bind(reserved.released_at)
        .bind(&reserved.assignee)
        .bind(i64::try_from(reserved.usage_counter).unwrap_or(i64::MAX))
        .bind(metadata)
        .bind(&reserved.notes)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, uid: ulid::Ulid) -> Result<()> {
        let result = sqlx::query("DELETE FROM reserved_ips WHERE uid = $1")
            .bind(ulid_to_uuid(uid))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(crate::error::StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_reserved(&self, filter: ReservedIpFilter) -> Result<Vec<ReservedIp>> {
        // Small, closed filter set — build the WHERE clause manually rather
        // than pulling in a query builder crate for three optional columns.
        let mut clauses = Vec::new();
        let mut binds: Vec<String> = Vec::new();
        if let Some(status) = filter.status {
            clauses.push(format!("status = ${}", binds.len() + 1));
            binds.push(status_to_str(status).to_string());
        }
        if let Some(location) = &filter.location {
            clauses.push(format!("datacenter_location = ${}", binds.len() + 1));
            binds.push(location.clone());
        }

        let mut query_str = "SELECT * FROM reserved_ips".to_string();
        if !clauses.is_empty() {
            query_str.push_str(" WHERE ");
            query_str.push_str(&clauses.join(" AND "));
        }
        query_str.push_str(" ORDER BY reserved_at DESC");

        let mut query = sqlx::query(&query_str);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut items = rows
            .into_iter()
            .map(row_to_reserved)
            .collect::<Result<Vec<_>>>()?;

        if let Some(blacklisted) = filter.blacklisted {
            items.retain(|ip| ip.is_blacklisted == blacklisted);
        }
        Ok(items)
    }

    async fn update_blacklist_status(
        &self,
        uid: ulid::Ulid,
        is_blacklisted: bool,
        zones: BTreeSet<String>,
    ) -> Result<()> {
        let zones_json = serde_json::to_value(&zones)
            .map_err(|e| crate::error::StoreError::InvalidInput(e.to_string()))?;

        let result = sqlx::query(
            r"
            UPDATE reserved_ips
            SET is_blacklisted = $2, blacklist_details = $3, last_checked_at = now()
            WHERE uid = $1
            ",
        )
        .bind(ulid_to_uuid(uid))
        .bind(is_blacklisted)
        .bind(zones_json)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::StoreError::NotFound);
        }
        Ok(())
    }

    async fn record_attempt(&self, attempt: ReservationAttempt) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO reservation_attempts
                (provider_block_id, ip, succeeded, action_taken, error, attempted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&attempt.provider_block_id)
        .bind(attempt.ip.as_ref().map(SendingIp::as_str))
        .bind(attempt.succeeded)
        .bind(attempt.action_taken.map(action_taken_to_str))
        .bind(&attempt.error)
        .bind(attempt.attempted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_blacklist_history(&self, entry: BlacklistHistory) -> Result<()> {
        let zones = serde_json::to_value(&entry.zones)
            .map_err(|e| crate::error::StoreError::InvalidInput(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO blacklist_history (reserved_ip_uid, was_blacklisted, zones, recorded_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(ulid_to_uuid(entry.reserved_ip_uid))
        .bind(entry.was_blacklisted)
        .bind(zones)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn statistics(&self) -> Result<ReservationStatistics> {
        let row = sqlx::query(
            r"
            SELECT
                count(*) AS total,
                count(*) FILTER (WHERE status = 'reserved') AS reserved,
                count(*) FILTER (WHERE status = 'in_use') AS in_use,
                count(*) FILTER (WHERE status = 'released') AS released,
                count(*) FILTER (WHERE status = 'quarantined') AS quarantined,
                count(*) FILTER (WHERE is_blacklisted) AS blacklisted
            FROM reserved_ips
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ReservationStatistics {
            total: u64::try_from(row.get::<i64, _>("total")).unwrap_or_default(),
            reserved: u64::try_from(row.get::<i64, _>("reserved")).unwrap_or_default(),
            in_use: u64::try_from(row.get::<i64, _>("in_use")).unwrap_or_default(),
            released: u64::try_from(row.get::<i64, _>("released")).unwrap_or_default(),
            quarantined: u64::try_from(row.get::<i64, _>("quarantined")).unwrap_or_default(),
            blacklisted: u64::try_from(row.get::<i64, _>("blacklisted")).unwrap_or_default(),
        })
    }

    async fn referenced_block_ids(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT provider_block_id FROM reserved_ips WHERE status IN ('reserved', 'in_use')",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("provider_block_id"))
            .collect())
    }
}
