use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reputation_common::{EnhancedCode, Fingerprint, RecipientDomain, SendingIp};
use sqlx::Row;

use crate::{error::Result, event_store::EventStore, model::FailureEvent};

use super::PgStore;

#[async_trait]
impl EventStore for PgStore {
    async fn record_failure(&self, event: FailureEvent) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO failure_events
                (sending_ip, recipient, recipient_domain, smtp_code, enhanced_code,
                 reason, receiving_mx, occurred_at, fingerprint, attempt_ordinal)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (fingerprint) DO NOTHING
            ",
        )
        .bind(event.sending_ip.as_str())
        .bind(&event.recipient)
        .bind(event.recipient_domain.as_str())
        .bind(i16::try_from(event.smtp_code).unwrap_or(i16::MAX))
        .bind(event.enhanced_code.as_ref().map(ToString::to_string))
        .bind(&event.reason)
        .bind(&event.receiving_mx)
        .bind(event.occurred_at)
        .bind(event.fingerprint.as_str())
        .bind(i32::try_from(event.attempt_ordinal).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn failures_by_ip_since(
        &self,
        ip: &SendingIp,
        since: DateTime<Utc>,
    ) -> Result<Vec<FailureEvent>> {
        let rows = sqlx::query(
            r"
            SELECT id, sending_ip, recipient, recipient_domain, smtp_code, enhanced_code,
                   reason, receiving_mx, occurred_at, fingerprint, attempt_ordinal
            FROM failure_events
            WHERE sending_ip = $1 AND occurred_at >= $2
            ORDER BY occurred_at DESC
            ",
        )
        .bind(ip.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_event).collect()
    }

    async fn ips_with_activity_since(&self, since: DateTime<Utc>) -> Result<Vec<SendingIp>> {
        let rows = sqlx::query(
            "SELECT DISTINCT sending_ip FROM failure_events WHERE occurred_at >= $1",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| SendingIp::parse(row.get::<String, _>("sending_ip").as_str()).ok())
            .collect())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM failure_events WHERE occurred_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn row_to_event(row: sqlx::postgres::PgRow) -> Result<FailureEvent> {
    let id: i64 = row.get("id");
    let smtp_code: i16 = row.get("smtp_code");
    let attempt_ordinal: i32 = row.get("attempt_ordinal");
    let enhanced_code: Option<String> = row.get("enhanced_code");
    let sending_ip: String = row.get("sending_ip");
    let recipient_domain: String = row.get("recipient_domain");
    let fingerprint: String = row.get("fingerprint");

    Ok(FailureEvent {
        id: u64::try_from(id).unwrap_or_default(),
        sending_ip: SendingIp::parse(&sending_ip)
            .map_err(|_| crate::error::StoreError::InvalidInput("sending_ip".into()))?,
        recipient: row.get("recipient"),
        recipient_domain: RecipientDomain::new(recipient_domain),
        smtp_code: u16::try_from(smtp_code).unwrap_or_default(),
        enhanced_code: enhanced_code.and_then(|c| c.parse::<EnhancedCode>().ok()),
        reason: row.get("reason"),
        receiving_mx: row.get("receiving_mx"),
        occurred_at: row.get("occurred_at"),
        fingerprint: Fingerprint::new(fingerprint),
        attempt_ordinal: u32::try_from(attempt_ordinal).unwrap_or_default(),
    })
}
