use async_trait::async_trait;
use reputation_common::{ReputationStatus, SendingIp};
use sqlx::Row;

use crate::{
    error::Result,
    model::{ActionKind, IpAction, ReputationState, TriggerSource},
    reputation_store::ReputationStore,
};

use super::PgStore;

fn status_to_str(status: ReputationStatus) -> &'static str {
    status.as_str()
}

fn status_from_str(raw: &str) -> ReputationStatus {
    match raw {
        "healthy" => ReputationStatus::Healthy,
        "warning" => ReputationStatus::Warning,
        "quarantine" => ReputationStatus::Quarantine,
        "blacklisted" => ReputationStatus::Blacklisted,
        _ => ReputationStatus::Unknown,
    }
}

#[async_trait]
impl ReputationStore for PgStore {
    async fn get_state(&self, ip: &SendingIp) -> Result<Option<ReputationState>> {
        let row = sqlx::query(
            r"
            SELECT ip, window_start, window_end, total_sent, total_rejected, rejection_ratio,
                   unique_domains_rejected, reason_counts, major_providers_rejecting, status,
                   last_updated, metadata
            FROM reputation_states WHERE ip = $1
            ",
        )
        .bind(ip.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_state).transpose()
    }

    async fn upsert_state(&self, state: ReputationState) -> Result<()> {
        let reason_counts = serde_json::to_value(&state.reason_counts)
            .map_err(|e| crate::error::StoreError::InvalidInput(e.to_string()))?;
        let major_providers = serde_json::to_value(&state.major_providers_rejecting)
            .map_err(|e| crate::error::StoreError::InvalidInput(e.to_string()))?;
        let metadata = serde_json::to_value(&state.metadata)
            .map_err(|e| crate::error::StoreError::InvalidInput(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO reputation_states
                (ip, window_start, window_end, total_sent, total_rejected, rejection_ratio,
                 unique_domains_rejected, reason_counts, major_providers_rejecting, status,
                 last_updated, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (ip) DO UPDATE SET
                window_start = EXCLUDED.window_start,
                window_end = EXCLUDED.window_end,
                total_sent = EXCLUDED.total_sent,
                total_rejected = EXCLUDED.total_rejected,
                rejection_ratio = EXCLUDED.rejection_ratio,
                unique_domains_rejected = EXCLUDED.unique_domains_rejected,
                reason_counts = EXCLUDED.reason_counts,
                major_providers_rejecting = EXCLUDED.major_providers_rejecting,
                status = EXCLUDED.status,
                last_updated = EXCLUDED.last_updated,
                metadata = EXCLUDED.metadata
            ",
        )
        .bind(state.ip.as_str())
        .bind(state.window_start)
        .bind(state.window_end)
        .bind(i64::try_from(state.total_sent).unwrap_or(i64::MAX))
        .bind(i64::try_from(state.total_rejected).unwrap_or(i64::MAX))
        .bind(state.rejection_ratio)
        .bind(i64::try_from(state.unique_domains_rejected).unwrap_or(i64::MAX))
        .bind(reason_counts)
        .bind(major_providers)
        .bind(status_to_str(state.status))
        .bind(state.last_updated)
        .bind(metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_states(&self, status: Option<ReputationStatus>) -> Result<Vec<ReputationState>> {
        let rows = if let Some(status) = status {
            sqlx::query(
                r"
                SELECT ip, window_start, window_end, total_sent, total_rejected, rejection_ratio,
                       unique_domains_rejected, reason_counts, major_providers_rejecting, status,
                       last_updated, metadata
                FROM reputation_states WHERE status = $1 ORDER BY last_updated DESC
                ",
            )
            .bind(status_to_str(status))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                r"
                SELECT ip, window_start, window_end, total_sent, total_rejected, rejection_ratio,
                       unique_domains_rejected, reason_counts, major_providers_rejecting, status,
                       last_updated, metadata
                FROM reputation_states ORDER BY last_updated DESC
                ",
            )
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(row_to_state).collect()
    }

    async fn append_action(&self, action: IpAction) -> Result<()> {
        let metadata = serde_json::to_value(&action.metadata)
            .map_err(|e| crate::error::StoreError::InvalidInput(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO ip_actions
                (ip, action, previous_status, new_status, reason, trigger_source, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(action.ip.as_str())
        .bind(action_kind_to_str(action.action))
        .bind(action.previous_status.map(status_to_str))
        .bind(status_to_str(action.new_status))
        .bind(&action.reason)
        .bind(trigger_to_str(action.trigger))
        .bind(metadata)
        .bind(action.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_actions(&self, ip: &SendingIp, limit: usize) -> Result<Vec<IpAction>> {
        let rows = sqlx::query(
            r"
            SELECT id, ip, action, previous_status, new_status, reason, trigger_source,
                   metadata, created_at
            FROM ip_actions WHERE ip = $1 ORDER BY created_at DESC LIMIT $2
            ",
        )
        .bind(ip.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_action).collect()
    }
}

fn row_to_state(row: sqlx::postgres::PgRow) -> Result<ReputationState> {
    let ip: String = row.get("ip");
    let total_sent: i64 = row.get("total_sent");
    let total_rejected: i64 = row.get("total_rejected");
    let unique_domains_rejected: i64 = row.get("unique_domains_rejected");
    let reason_counts: serde_json::Value = row.get("reason_counts");
    let major_providers: serde_json::Value = row.get("major_providers_rejecting");
    let metadata: serde_json::Value = row.get("metadata");
    let status: String = row.get("status");

    Ok(ReputationState {
        ip: SendingIp::parse(&ip).map_err(|_| crate::error::StoreError::InvalidInput("ip".into()))?,
        window_start: row.get("window_start"),
        window_end: row.get("window_end"),
        total_sent: u64::try_from(total_sent).unwrap_or_default(),
        total_rejected: u64::try_from(total_rejected).unwrap_or_default(),
        rejection_ratio: row.get("rejection_ratio"),
        unique_domains_rejected: u64::try_from(unique_domains_rejected).unwrap_or_default(),
        reason_counts: serde_json::from_value(reason_counts).unwrap_or_default(),
        major_providers_rejecting: serde_json::from_value(major_providers).unwrap_or_default(),
        status: status_from_str(&status),
        last_updated: row.get("last_updated"),
        metadata: serde_json::from_value(metadata).unwrap_or_default(),
    })
}

fn row_to_action(row: sqlx::postgres::PgRow) -> Result<IpAction> {
    let id: i64 = row.get("id");
    let ip: String = row.get("ip");
    let action: String = row.get("action");
    let previous_status: Option<String> = row.get("previous_status");
    let new_status: String = row.get("new_status");
    let trigger_source: String = row.get("trigger_source");
    let metadata: serde_json::Value = row.get("metadata");

    Ok(IpAction {
        id: u64::try_from(id).unwrap_or_default(),
        ip: SendingIp::parse(&ip).map_err(|_| crate::error::StoreError::InvalidInput("ip".into()))?,
        action: action_kind_from_str(&action),
        previous_status: previous_status.map(|s| status_from_str(&s)),
        new_status: status_from_str(&new_status),
        reason: row.get("reason"),
        trigger: trigger_from_str(&trigger_source),
        metadata: serde_json::from_value(metadata).unwrap_or_default(),
        created_at: row.get("created_at"),
    })
}

fn action_kind_to_str(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::StatusChange => "status_change",
        ActionKind::ManualQuarantine => "manual_quarantine",
        ActionKind::DnsblProbeTriggered => "dnsbl_probe_triggered",
    }
}

fn action_kind_from_str(raw: &str) -> ActionKind {
    match raw {
        "manual_quarantine" => ActionKind::ManualQuarantine,
        "dnsbl_probe_triggered" => ActionKind::DnsblProbeTriggered,
        _ => ActionKind::StatusChange,
    }
}

fn trigger_to_str(trigger: TriggerSource) -> &'static str {
    match trigger {
        TriggerSource::Automated => "automated",
        TriggerSource::Manual => "manual",
    }
}

fn trigger_from_str(raw: &str) -> TriggerSource {
    match raw {
        "manual" => TriggerSource::Manual,
        _ => TriggerSource::Automated,
    }
}
