//! Provisioner configuration: upstream IaaS endpoint and
//! credentials plus the retry/delay knobs of the acquire-vet-commit loop,
//! structured like `reputation_dnsbl::config::DnsblConfig`.

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitBreakerConfig;

mod defaults {
    pub fn base_url() -> String {
        "https://iaas.example.internal/v1".to_string()
    }
    pub fn bearer_token() -> String {
        String::new()
    }
    pub fn default_location() -> String {
        "us-east".to_string()
    }
    pub const fn default_block_size() -> u32 {
        1
    }
    pub const fn estimated_quota() -> u32 {
        50
    }
    pub const fn inter_attempt_delay_secs() -> u64 {
        1
    }
    pub const fn inter_delete_delay_millis() -> u64 {
        300
    }
    pub const fn empty_block_retry_delay_secs() -> u64 {
        5
    }
    pub const fn request_timeout_secs() -> u64 {
        10
    }
    /// Blocks of this declared size are never deleted by
    /// `CleanupSingleIPBlocks`, regardless of database references.
    pub const fn protected_block_size() -> u32 {
        11
    }
}

/// Configuration for the Provisioner (C7) and the Reservation Inventory
/// (C6) it writes through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerConfig {
    #[serde(default = "defaults::base_url")]
    pub base_url: String,
    #[serde(default = "defaults::bearer_token")]
    pub bearer_token: String,
    #[serde(default = "defaults::default_location")]
    pub default_location: String,
    #[serde(default = "defaults::default_block_size")]
    pub default_block_size: u32,
    #[serde(default = "defaults::estimated_quota")]
    pub estimated_quota: u32,
    #[serde(default = "defaults::inter_attempt_delay_secs")]
    pub inter_attempt_delay_secs: u64,
    #[serde(default = "defaults::inter_delete_delay_millis")]
    pub inter_delete_delay_millis: u64,
    #[serde(default = "defaults::empty_block_retry_delay_secs")]
    pub empty_block_retry_delay_secs: u64,
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "defaults::protected_block_size")]
    pub protected_block_size: u32,

    /// Guards every upstream IaaS call.
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            bearer_token: defaults::bearer_token(),
            default_location: defaults::default_location(),
            default_block_size: defaults::default_block_size(),
            estimated_quota: defaults::estimated_quota(),
            inter_attempt_delay_secs: defaults::inter_attempt_delay_secs(),
            inter_delete_delay_millis: defaults::inter_delete_delay_millis(),
            empty_block_retry_delay_secs: defaults::empty_block_retry_delay_secs(),
            request_timeout_secs: defaults::request_timeout_secs(),
            protected_block_size: defaults::protected_block_size(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}
