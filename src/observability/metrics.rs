//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vmquery_datasource_requests_total` (counter): queries by type, kind, result
//! - `vmquery_datasource_request_duration_seconds` (histogram): query latency
//!
//! Without an installed recorder every update is a no-op, so library users
//! that do not call [`init_metrics`] pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub(crate) struct MetricDescriptor {
    pub name: &'static str,
    description: &'static str,
}

pub(crate) const DATASOURCE_REQUESTS_TOTAL: MetricDescriptor = MetricDescriptor {
    name: "vmquery_datasource_requests_total",
    description: "Total queries sent to the datasource",
};

pub(crate) const DATASOURCE_REQUEST_DURATION_SECONDS: MetricDescriptor = MetricDescriptor {
    name: "vmquery_datasource_request_duration_seconds",
    description: "Datasource query latency in seconds, including response decoding",
};

/// Install the Prometheus exporter on `addr` and describe all metrics.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_counter!(DATASOURCE_REQUESTS_TOTAL.name, DATASOURCE_REQUESTS_TOTAL.description);
    metrics::describe_histogram!(
        DATASOURCE_REQUEST_DURATION_SECONDS.name,
        DATASOURCE_REQUEST_DURATION_SECONDS.description
    );

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one datasource query.
pub fn record_query(datasource_type: &'static str, kind: &'static str, success: bool, start: Instant) {
    let result = if success { "ok" } else { "error" };
    metrics::counter!(
        DATASOURCE_REQUESTS_TOTAL.name,
        "type" => datasource_type,
        "kind" => kind,
        "result" => result
    )
    .increment(1);
    metrics::histogram!(
        DATASOURCE_REQUEST_DURATION_SECONDS.name,
        "type" => datasource_type,
        "kind" => kind
    )
    .record(start.elapsed().as_secs_f64());
}
