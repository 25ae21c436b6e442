//! Persisted entities. One struct per entity, mapping 1:1 to the
//! relational tables in the Postgres backend.

use std::collections::BTreeSet;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use reputation_common::{EnhancedCode, Fingerprint, RecipientDomain, ReputationStatus, SendingIp};
use serde::{Deserialize, Serialize};

/// An immutable delivery-failure event, deduplicated by `fingerprint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureEvent {
    /// Monotone store-assigned id.
    pub id: u64,
    pub sending_ip: SendingIp,
    pub recipient: String,
    /// Derived: lower-cased substring after the final `@`.
    pub recipient_domain: RecipientDomain,
    pub smtp_code: u16,
    pub enhanced_code: Option<EnhancedCode>,
    pub reason: String,
    pub receiving_mx: String,
    pub occurred_at: DateTime<Utc>,
    pub fingerprint: Fingerprint,
    pub attempt_ordinal: u32,
}

/// Current reputation state for one sending IP (one row per IP).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationState {
    pub ip: SendingIp,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub total_sent: u64,
    pub total_rejected: u64,
    pub rejection_ratio: f64,
    pub unique_domains_rejected: u64,
    pub reason_counts: AHashMap<String, u64>,
    pub major_providers_rejecting: BTreeSet<String>,
    pub status: ReputationStatus,
    pub last_updated: DateTime<Utc>,
    pub metadata: AHashMap<String, String>,
}

/// Action kind for the append-only [`IpAction`] audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    StatusChange,
    ManualQuarantine,
    DnsblProbeTriggered,
}

/// Who (or what) triggered an [`IpAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Automated,
    Manual,
}

/// Append-only audit entry for a reputation-state transition or operator action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpAction {
    pub id: u64,
    pub ip: SendingIp,
    pub action: ActionKind,
    pub previous_status: Option<ReputationStatus>,
    pub new_status: ReputationStatus,
    pub reason: String,
    pub trigger: TriggerSource,
    pub metadata: AHashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Severity derived from a DNSBL probe's listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// Append-only DNSBL probe result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsblCheck {
    pub id: u64,
    pub ip: SendingIp,
    pub checked_at: DateTime<Utc>,
    pub listed: bool,
    pub listings: BTreeSet<String>,
    pub duration_ms: u64,
    pub severity: Severity,
    pub metadata: AHashMap<String, String>,
}

/// Lifecycle status for an externally reserved IP block member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservedIpStatus {
    Reserved,
    InUse,
    Released,
    Quarantined,
}

/// A single previously vetted outbound IP (one per successfully vetted IP).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservedIp {
    pub uid: ulid::Ulid,
    pub ip: SendingIp,
    pub provider_block_id: String,
    pub datacenter_location: String,
    pub status: ReservedIpStatus,
    pub is_blacklisted: bool,
    pub blacklist_details: BTreeSet<String>,
    pub reserved_at: DateTime<Utc>,
    pub last_checked_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
    pub usage_counter: u64,
    pub metadata: AHashMap<String, String>,
    pub notes: String,
}

/// Outcome recorded for a single Provisioner attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTaken {
    Kept,
    Deleted,
    Quarantined,
    KeptButNotStored,
}

/// Append-only record of one Provisioner reservation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationAttempt {
    pub id: u64,
    pub provider_block_id: Option<String>,
    pub ip: Option<SendingIp>,
    pub succeeded: bool,
    pub action_taken: Option<ActionTaken>,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

/// Append-only blacklist-status history entry for a [`ReservedIp`] (FK `uid`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistHistory {
    pub id: u64,
    pub reserved_ip_uid: ulid::Ulid,
    pub was_blacklisted: bool,
    pub zones: BTreeSet<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Optional filter on [`ReputationState::status`] for `ListStates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFilter(pub ReputationStatus);
