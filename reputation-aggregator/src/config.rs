//! Aggregator schedule configuration: scan/process interval
//! fields alongside a nested classifier policy config.

use reputation_classifier::ClassifierConfig;
use serde::{Deserialize, Serialize};

const fn default_aggregation_interval_secs() -> u64 {
    300
}

/// Configuration for the periodic Aggregator worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// How often the ticker fires.
    #[serde(default = "default_aggregation_interval_secs")]
    pub aggregation_interval_secs: u64,

    /// Classifier thresholds, including `window_minutes`.
    #[serde(flatten)]
    pub classifier: ClassifierConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            aggregation_interval_secs: default_aggregation_interval_secs(),
            classifier: ClassifierConfig::default(),
        }
    }
}
