//! Prometheus metrics HTTP server.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`
//! to expose the pipeline counters, gauges and histograms.

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use unilog_core::config::MetricsConfig;
use unilog_core::metrics as m;

/// Install the global metrics recorder and start the HTTP listener.
///
/// Call once per process. After this, every `metrics::counter!()`,
/// `metrics::gauge!()` and `metrics::histogram!()` in the pipeline is exported.
///
/// # Errors
///
/// - Endpoint other than `/metrics`
/// - Invalid listen address
/// - Socket binding fails or a global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    if config.endpoint != "/metrics" {
        return Err(anyhow::anyhow!(
            "unsupported metrics endpoint '{}': only '/metrics' is currently supported",
            config.endpoint
        ));
    }

    let addr: SocketAddr = format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict listen_addr in untrusted networks"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(m::PIPELINE_ITEM_DURATION_SECONDS.to_owned()),
            m::PROCESSING_DURATION_BUCKETS,
        )
        .map_err(|e| anyhow::anyhow!("invalid histogram buckets: {}", e))?
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    m::describe_all();
    record_build_info();

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");
    Ok(())
}

/// Record the constant build-info gauge.
pub fn record_build_info() {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}
