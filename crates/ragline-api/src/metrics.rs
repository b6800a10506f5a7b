//! Prometheus recorder installation
//!
//! Installs the global `metrics` recorder with the bucket layout the
//! dashboards expect and registers help text for every exposition name
//! emitted across the workspace.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const REQUEST_DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0];
const DEPENDENCY_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0];

/// Install the process-wide recorder and return the exposition handle.
///
/// # Errors
///
/// Returns `BuildError` when a recorder is already installed or the bucket
/// configuration is rejected.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("process_request_duration_seconds".to_owned()),
            REQUEST_DURATION_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full("dependency_latency_seconds".to_owned()),
            DEPENDENCY_LATENCY_BUCKETS,
        )?
        .install_recorder()?;

    describe_counter!(
        "http_requests_total",
        "Total number of requests labelled by path and status"
    );
    describe_gauge!("count_jobs_in_queue", "Number of jobs in queue");
    describe_gauge!(
        "dispatcher_signal_count",
        "How often ingress has signalled the dispatcher to add a worker"
    );
    describe_gauge!("active_worker_count", "Number of active workers");
    describe_histogram!(
        "process_request_duration_seconds",
        "Total job execution time by terminal status"
    );
    describe_histogram!(
        "dependency_latency_seconds",
        "Latency of external service calls"
    );
    Ok(handle)
}
