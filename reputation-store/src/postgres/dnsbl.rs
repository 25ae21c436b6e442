use async_trait::async_trait;
use reputation_common::SendingIp;
use sqlx::Row;

use crate::{
    dnsbl_store::DnsblCheckStore,
    error::Result,
    model::{DnsblCheck, Severity},
};

use super::PgStore;

fn severity_to_str(severity: Severity) -> &'static str {
    match severity {
        Severity::None => "none",
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
        Severity::Critical => "critical",
    }
}

fn severity_from_str(raw: &str) -> Severity {
    match raw {
        "low" => Severity::Low,
        "medium" => Severity::Medium,
        "high" => Severity::High,
        "critical" => Severity::Critical,
        _ => Severity::None,
    }
}

#[async_trait]
impl DnsblCheckStore for PgStore {
    async fn record_check(&self, check: DnsblCheck) -> Result<()> {
        let listings = serde_json::to_value(&check.listings)
            .map_err(|e| crate::error::StoreError::InvalidInput(e.to_string()))?;
        let metadata = serde_json::to_value(&check.metadata)
            .map_err(|e| crate::error::StoreError::InvalidInput(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO dnsbl_checks (ip, checked_at, listed, listings, duration_ms, severity, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(check.ip.as_str())
        .bind(check.checked_at)
        .bind(check.listed)
        .bind(listings)
        .bind(i64::try_from(check.duration_ms).unwrap_or(i64::MAX))
        .bind(severity_to_str(check.severity))
        .bind(metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_for_ip(&self, ip: &SendingIp) -> Result<Option<DnsblCheck>> {
        let row = sqlx::query(
            r"
            SELECT id, ip, checked_at, listed, listings, duration_ms, severity, metadata
            FROM dnsbl_checks WHERE ip = $1 ORDER BY checked_at DESC LIMIT 1
            ",
        )
        .bind(ip.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let id: i64 = row.get("id");
        let duration_ms: i64 = row.get("duration_ms");
        let listings: serde_json::Value = row.get("listings");
        let metadata: serde_json::Value = row.get("metadata");
        let severity: String = row.get("severity");
        let ip_str: String = row.get("ip");

        Ok(Some(DnsblCheck {
            id: u64::try_from(id).unwrap_or_default(),
            ip: SendingIp::parse(&ip_str)
                .map_err(|_| crate::error::StoreError::InvalidInput("ip".into()))?,
            checked_at: row.get("checked_at"),
            listed: row.get("listed"),
            listings: serde_json::from_value(listings).unwrap_or_default(),
            duration_ms: u64::try_from(duration_ms).unwrap_or_default(),
            severity: severity_from_str(&severity),
            metadata: serde_json::from_value(metadata).unwrap_or_default(),
        }))
    }
}
