//! Metrics are recorded through the `metrics` facade and exported in the
//! Prometheus text format by `metrics-exporter-prometheus`.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Latency of individual ticket-store calls, labeled by `action`.
pub const STORE_REQUEST_LATENCY: &str = "jira_request_latency_seconds";
/// Latency of inbound webhook requests.
pub const REQUEST_LATENCY: &str = "request_latency_seconds";
/// Completed reconciliation passes, labeled by `outcome`.
pub const RECONCILIATIONS: &str = "reconciliations_total";

/// Install the global Prometheus recorder, returning a handle which renders it.
pub fn install() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets(&latency_buckets())?
        .install_recorder()?;
    Ok(handle)
}

// Store calls are network round-trips: 5ms through ~40s.
fn latency_buckets() -> Vec<f64> {
    prometheus::exponential_buckets(0.005, 2.0, 14).expect("calculating histogram buckets")
}

/// Await `fut`, recording its duration under `action`.
/// Duration is recorded whether or not the call succeeds.
pub async fn timed<F, T>(action: &'static str, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let started = std::time::Instant::now();
    let out = fut.await;

    metrics::histogram!(STORE_REQUEST_LATENCY, "action" => action)
        .record(started.elapsed().as_secs_f64());
    out
}
