//! Top-level configuration: the union of every component's config
//! sub-struct under one `[section]` per component, loaded from a single TOML
//! file with `${VAR:default}` substitution, one top-level struct field per
//! controlled subsystem.

use reputation_aggregator::AggregatorConfig;
use reputation_dnsbl::DnsblConfig;
use reputation_health::HealthConfig;
use reputation_metrics::MetricsConfig;
use reputation_provisioner::ProvisionerConfig;
use serde::{Deserialize, Serialize};

mod defaults {
    pub fn listen_address() -> String {
        "[::]:8080".to_string()
    }
    pub const fn recent_actions_limit() -> usize {
        20
    }
}

/// The query/action HTTP surface (C8) and the inbound webhook it fronts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    #[serde(default = "defaults::listen_address")]
    pub listen_address: String,

    /// How many `IpAction` rows `GET /ips/{ip}/reputation` includes.
    #[serde(default = "defaults::recent_actions_limit")]
    pub recent_actions_limit: usize,

    /// Shared secret the inbound webhook must present as a bearer token.
    /// Unset leaves the endpoint unauthenticated; only appropriate
    /// behind a private network boundary.
    #[serde(default)]
    pub webhook_shared_secret: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_address: defaults::listen_address(),
            recent_actions_limit: defaults::recent_actions_limit(),
            webhook_shared_secret: None,
        }
    }
}

/// Persistence backend selection. A missing or empty `url` runs the
/// engine against the in-memory stores — suitable for the test harness
/// and local development, never for production, where state must
/// outlive the process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

/// Root configuration, one section per component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub dnsbl: DnsblConfig,
    #[serde(default)]
    pub provisioner: ProvisionerConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl ServerConfig {
    /// Parse `raw` TOML after substituting `${VAR:default}` references.
    ///
    /// # Errors
    /// Returns an error if the substituted text is not valid TOML for this
    /// shape.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        let substituted = reputation_common::config::substitute_env(raw);
        toml::from_str(&substituted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_every_default() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config.api.listen_address, "[::]:8080");
        assert!(config.database.url.is_none());
        assert_eq!(config.aggregator.aggregation_interval_secs, 300);
    }

    #[test]
    fn substitutes_environment_references_before_parsing() {
        unsafe { std::env::set_var("REPUTATION_SERVER_TEST_PORT", "[::]:9090") };
        let config = ServerConfig::from_toml_str(
            "[api]\nlisten_address = \"${REPUTATION_SERVER_TEST_PORT}\"\n",
        )
        .unwrap();
        assert_eq!(config.api.listen_address, "[::]:9090");
        unsafe { std::env::remove_var("REPUTATION_SERVER_TEST_PORT") };
    }

    #[test]
    fn database_url_from_env_with_default_fallback() {
        unsafe { std::env::remove_var("REPUTATION_SERVER_TEST_DB") };
        let config = ServerConfig::from_toml_str(
            "[database]\nurl = \"${REPUTATION_SERVER_TEST_DB:}\"\n",
        )
        .unwrap();
        assert_eq!(config.database.url, Some(String::new()));
    }
}
