//! Metrics configuration.

use serde::{Deserialize, Serialize};

const fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:4318/v1/metrics".to_string()
}

/// Configuration for OTLP metrics export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// When disabled, [`crate::init_metrics`] is a no-op and
    /// [`crate::is_enabled`] returns `false`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// OTLP/HTTP endpoint metrics are pushed to.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Optional bearer token sent as `Authorization: Bearer <key>` with
    /// every export.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            api_key: None,
        }
    }
}
