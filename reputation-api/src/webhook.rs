//! `POST /webhook/delivery-failure`: the inbound ingest surface for
//! C1. Structural JSON failures are rejected by axum's `Json` extractor
//! before this handler runs (HTTP 400); everything else — including
//! per-event validation failures and duplicate fingerprints — is folded
//! into the `{processed, failed, total}` response body with a 200.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use reputation_common::{EnhancedCode, ErrorKind, Fingerprint, RecipientDomain, SendingIp};
use reputation_store::model::FailureEvent;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

const DELIVERY_FAILURE_EVENT_TYPE: &str = "smtp.delivery.failure";

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub ip: String,
    pub recipient: String,
    pub smtp_code: u16,
    pub enhanced_code: Option<String>,
    pub reason: String,
    pub mx: String,
    pub attempt_number: u32,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub processed: u64,
    pub failed: u64,
    pub total: u64,
}

fn to_failure_event(event: &WebhookEvent) -> Result<FailureEvent, ()> {
    let sending_ip = SendingIp::parse(&event.data.ip).map_err(|_| ())?;
    let recipient_domain =
        RecipientDomain::from_recipient_address(&event.data.recipient).ok_or(())?;
    let enhanced_code = match &event.data.enhanced_code {
        Some(raw) if !raw.is_empty() => Some(raw.parse::<EnhancedCode>().map_err(|_| ())?),
        _ => None,
    };
    let occurred_at: DateTime<Utc> = if event.created_at.is_empty() {
        Utc::now()
    } else {
        DateTime::parse_from_rfc3339(&event.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ())?
    };

    Ok(FailureEvent {
        id: 0,
        sending_ip,
        recipient: event.data.recipient.clone(),
        recipient_domain,
        smtp_code: event.data.smtp_code,
        enhanced_code,
        reason: event.data.reason.clone(),
        receiving_mx: event.data.mx.clone(),
        occurred_at,
        fingerprint: Fingerprint::new(&event.id),
        attempt_ordinal: event.data.attempt_number,
    })
}

/// `POST /webhook/delivery-failure`.
pub async fn ingest_delivery_failures(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookPayload>,
) -> impl IntoResponse {
    let total = payload.events.len() as u64;
    let mut processed = 0u64;
    let mut failed = 0u64;
    let mut storage_unavailable = false;

    for event in &payload.events {
        if event.event_type != DELIVERY_FAILURE_EVENT_TYPE {
            continue;
        }

        let Ok(failure_event) = to_failure_event(event) else {
            failed += 1;
            continue;
        };

        match state.event_store.record_failure(failure_event).await {
            // Newly inserted or a duplicate fingerprint — both count as
            // processed.
            Ok(_) => processed += 1,
            Err(e) => {
                tracing::error!(event_id = %event.id, error = %e, "failed to record delivery failure");
                failed += 1;
                if e.kind() == ErrorKind::StorageUnavailable {
                    storage_unavailable = true;
                }
            }
        }
    }

    let body = WebhookResponse {
        processed,
        failed,
        total,
    };
    let status = if storage_unavailable {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, ip: &str, recipient: &str) -> WebhookEvent {
        WebhookEvent {
            id: id.to_string(),
            created_at: String::new(),
            event_type: DELIVERY_FAILURE_EVENT_TYPE.to_string(),
            data: WebhookEventData {
                ip: ip.to_string(),
                recipient: recipient.to_string(),
                smtp_code: 550,
                enhanced_code: Some("5.7.1".to_string()),
                reason: "blocked".to_string(),
                mx: "mx.example.com".to_string(),
                attempt_number: 1,
            },
        }
    }

    #[test]
    fn converts_a_well_formed_event() {
        let converted = to_failure_event(&event("fp-1", "203.0.113.10", "user@gmail.com"));
        assert!(converted.is_ok());
        let failure = converted.unwrap();
        assert_eq!(failure.recipient_domain.as_str(), "gmail.com");
        assert_eq!(failure.fingerprint.as_str(), "fp-1");
    }

    #[test]
    fn rejects_an_unparsable_ip() {
        let converted = to_failure_event(&event("fp-2", "not-an-ip", "user@gmail.com"));
        assert!(converted.is_err());
    }

    #[test]
    fn rejects_a_recipient_with_no_domain() {
        let converted = to_failure_event(&event("fp-3", "203.0.113.10", "not-an-address"));
        assert!(converted.is_err());
    }
}
