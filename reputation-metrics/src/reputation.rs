//! Domain metrics for the reputation engine: per-IP status gauge, Aggregator
//! tick duration, DNSBL probe duration, and Provisioner reservation-attempt
//! counters — a `Counter`/`Histogram` built once, plus observable gauges
//! backed by a shared `DashMap` snapshot read through a callback.

use std::sync::Arc;

use dashmap::DashMap;
use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram, Meter},
};
use reputation_common::ReputationStatus;

use crate::error::MetricsError;

/// Reputation-engine metrics collector.
#[derive(Debug)]
pub struct ReputationMetrics {
    /// Per-IP current status, read by the `reputation.ip.status` observable
    /// gauge.
    status_by_ip: Arc<DashMap<String, i64>>,
    tick_duration_seconds: Histogram<f64>,
    probe_duration_seconds: Histogram<f64>,
    reservation_attempts_total: Counter<u64>,
    status_transitions_total: Counter<u64>,
}

impl ReputationMetrics {
    /// # Errors
    /// Returns an error if any metric instrument cannot be created.
    pub fn new() -> Result<Self, MetricsError> {
        let meter = meter();

        let status_by_ip = Arc::new(DashMap::new());
        let gauge_source = Arc::clone(&status_by_ip);
        meter
            .i64_observable_gauge("reputation.ip.status")
            .with_description("Current reputation status per sending IP (0=unknown .. 4=blacklisted)")
            .with_callback(move |observer| {
                for entry in gauge_source.iter() {
                    observer.observe(*entry.value(), &[KeyValue::new("ip", entry.key().clone())]);
                }
            })
            .build();

        let tick_duration_seconds = meter
            .f64_histogram("reputation.aggregator.tick.duration.seconds")
            .with_description("Wall-clock duration of an Aggregator tick")
            .build();

        let probe_duration_seconds = meter
            .f64_histogram("reputation.dnsbl.probe.duration.seconds")
            .with_description("Wall-clock duration of a DNSBL probe")
            .build();

        let reservation_attempts_total = meter
            .u64_counter("reputation.provisioner.attempts.total")
            .with_description("Total Provisioner reservation attempts by outcome")
            .build();

        let status_transitions_total = meter
            .u64_counter("reputation.aggregator.transitions.total")
            .with_description("Total reputation status transitions by new status")
            .build();

        Ok(Self {
            status_by_ip,
            tick_duration_seconds,
            probe_duration_seconds,
            reservation_attempts_total,
            status_transitions_total,
        })
    }

    pub fn set_ip_status(&self, ip: &str, status: ReputationStatus) {
        self.status_by_ip.insert(ip.to_string(), status.as_gauge_value());
    }

    pub fn record_tick_duration(&self, duration_secs: f64) {
        self.tick_duration_seconds.record(duration_secs, &[]);
    }

    pub fn record_probe_duration(&self, duration_secs: f64) {
        self.probe_duration_seconds.record(duration_secs, &[]);
    }

    pub fn record_reservation_attempt(&self, action: &str) {
        self.reservation_attempts_total
            .add(1, &[KeyValue::new("action", action.to_string())]);
    }

    pub fn record_status_transition(&self, new_status: ReputationStatus) {
        self.status_transitions_total
            .add(1, &[KeyValue::new("status", new_status.as_str())]);
    }
}

fn meter() -> Meter {
    opentelemetry::global::meter("reputation.engine")
}
