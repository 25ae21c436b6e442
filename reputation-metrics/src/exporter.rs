//! OTLP metrics exporter setup.

use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;

use crate::error::MetricsError;

/// # Errors
/// Returns an error if the OTLP exporter cannot be built.
pub fn init_otlp_exporter(endpoint: &str) -> Result<SdkMeterProvider, MetricsError> {
    tracing::info!(endpoint = %endpoint, "configuring OTLP metrics exporter");

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| {
            tracing::error!(endpoint = %endpoint, error = %e, "failed to build OTLP exporter");
            MetricsError::OpenTelemetry(e.to_string())
        })?;

    let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter).build();
    let provider = SdkMeterProvider::builder().with_reader(reader).build();

    tracing::info!("OTLP metrics exporter initialized");
    Ok(provider)
}
