//! OpenTelemetry metrics for the IP deliverability reputation engine: a
//! global-singleton + OTLP-exporter shape.

mod config;
mod error;
mod exporter;
mod reputation;

pub use config::MetricsConfig;
pub use error::MetricsError;
use once_cell::sync::OnceCell;
pub use reputation::ReputationMetrics;

static METRICS_INSTANCE: OnceCell<Metrics> = OnceCell::new();

#[derive(Debug)]
pub struct Metrics {
    pub reputation: ReputationMetrics,
}

/// Initialize the metrics system. Must be called once at startup. A no-op
/// if `config.enabled` is `false`.
///
/// # Errors
/// Returns an error if the OTLP exporter or any instrument fails to build,
/// or if called more than once.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        tracing::info!("metrics collection is disabled");
        return Ok(());
    }

    tracing::info!(endpoint = %config.endpoint, "initializing OpenTelemetry metrics");
    let provider = exporter::init_otlp_exporter(&config.endpoint)?;
    opentelemetry::global::set_meter_provider(provider);

    let metrics = Metrics {
        reputation: ReputationMetrics::new()?,
    };

    METRICS_INSTANCE
        .set(metrics)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    tracing::info!("metrics collection initialized");
    Ok(())
}

/// # Panics
/// Panics if [`init_metrics`] has not been called.
#[must_use]
pub fn metrics() -> &'static Metrics {
    METRICS_INSTANCE
        .get()
        .expect("metrics not initialized, call init_metrics() first")
}

#[must_use]
pub fn is_enabled() -> bool {
    METRICS_INSTANCE.get().is_some()
}

/// `Some(&Metrics)` once [`init_metrics`] has run successfully, `None`
/// otherwise (disabled by config, or not yet called) — the guard call sites
/// elsewhere in the workspace use instead of the panicking [`metrics`].
#[must_use]
pub fn try_metrics() -> Option<&'static Metrics> {
    METRICS_INSTANCE.get()
}
