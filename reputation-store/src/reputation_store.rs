use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use reputation_common::{ReputationStatus, SendingIp};

use crate::{
    error::Result,
    model::{IpAction, ReputationState},
};

/// C2: current per-IP reputation state, plus the append-only action audit log.
#[async_trait]
pub trait ReputationStore: Send + Sync + std::fmt::Debug {
    async fn get_state(&self, ip: &SendingIp) -> Result<Option<ReputationState>>;

    /// Atomic replace keyed by IP (exactly one record per IP).
    async fn upsert_state(&self, state: ReputationState) -> Result<()>;

    /// All states, optionally filtered by status, newest `last_updated` first.
    async fn list_states(&self, status: Option<ReputationStatus>) -> Result<Vec<ReputationState>>;

    async fn append_action(&self, action: IpAction) -> Result<()>;

    /// The `limit` most recent actions for `ip`, newest-first.
    async fn recent_actions(&self, ip: &SendingIp, limit: usize) -> Result<Vec<IpAction>>;
}

#[derive(Debug, Default)]
pub struct MemoryReputationStore {
    states: DashMap<SendingIp, ReputationState>,
    actions: DashMap<SendingIp, Vec<IpAction>>,
    next_action_id: AtomicU64,
}

impl MemoryReputationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReputationStore for MemoryReputationStore {
    async fn get_state(&self, ip: &SendingIp) -> Result<Option<ReputationState>> {
        Ok(self.states.get(ip).map(|entry| entry.value().clone()))
    }

    async fn upsert_state(&self, state: ReputationState) -> Result<()> {
        self.states.insert(state.ip.clone(), state);
        Ok(())
    }

    async fn list_states(&self, status: Option<ReputationStatus>) -> Result<Vec<ReputationState>> {
        let mut states: Vec<ReputationState> = self
            .states
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|state| status.is_none_or(|wanted| state.status == wanted))
            .collect();
        states.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(states)
    }

    async fn append_action(&self, mut action: IpAction) -> Result<()> {
        action.id = self.next_action_id.fetch_add(1, Ordering::Relaxed);
        self.actions.entry(action.ip.clone()).or_default().push(action);
        Ok(())
    }

    async fn recent_actions(&self, ip: &SendingIp, limit: usize) -> Result<Vec<IpAction>> {
        let Some(entry) = self.actions.get(ip) else {
            return Ok(Vec::new());
        };
        let mut actions = entry.value().clone();
        actions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        actions.truncate(limit);
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn state(ip: &str, status: ReputationStatus) -> ReputationState {
        ReputationState {
            ip: SendingIp::parse(ip).unwrap(),
            window_start: Utc::now(),
            window_end: Utc::now(),
            total_sent: 100,
            total_rejected: 0,
            rejection_ratio: 0.0,
            unique_domains_rejected: 0,
            reason_counts: AHashMap::default(),
            major_providers_rejecting: BTreeSet::new(),
            status,
            last_updated: Utc::now(),
            metadata: AHashMap::default(),
        }
    }

    fn action(ip: &str, new_status: ReputationStatus) -> IpAction {
        IpAction {
            id: 0,
            ip: SendingIp::parse(ip).unwrap(),
            action: crate::model::ActionKind::StatusChange,
            previous_status: Some(ReputationStatus::Healthy),
            new_status,
            reason: "test".into(),
            trigger: crate::model::TriggerSource::Automated,
            metadata: AHashMap::default(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_the_single_row_for_an_ip() {
        let store = MemoryReputationStore::new();
        let ip = SendingIp::parse("203.0.113.10").unwrap();
        store.upsert_state(state("203.0.113.10", ReputationStatus::Healthy)).await.unwrap();
        store.upsert_state(state("203.0.113.10", ReputationStatus::Warning)).await.unwrap();

        let got = store.get_state(&ip).await.unwrap().unwrap();
        assert_eq!(got.status, ReputationStatus::Warning);
        assert_eq!(store.list_states(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_states_filters_by_status() {
        let store = MemoryReputationStore::new();
        store.upsert_state(state("203.0.113.10", ReputationStatus::Healthy)).await.unwrap();
        store.upsert_state(state("203.0.113.11", ReputationStatus::Blacklisted)).await.unwrap();

        let blacklisted = store.list_states(Some(ReputationStatus::Blacklisted)).await.unwrap();
        assert_eq!(blacklisted.len(), 1);
        assert_eq!(blacklisted[0].ip.as_str(), "203.0.113.11");
    }

    #[tokio::test]
    async fn recent_actions_are_newest_first_and_bounded() {
        let store = MemoryReputationStore::new();
        let ip = "203.0.113.10";
        for status in [
            ReputationStatus::Warning,
            ReputationStatus::Quarantine,
            ReputationStatus::Blacklisted,
        ] {
            store.append_action(action(ip, status)).await.unwrap();
        }

        let recent = store
            .recent_actions(&SendingIp::parse(ip).unwrap(), 2)
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].new_status, ReputationStatus::Blacklisted);
        assert_eq!(recent[1].new_status, ReputationStatus::Quarantine);
    }
}
