//! Application state for axum handlers
//!
//! Built once at startup and injected into every handler, so connection
//! pools and services are shared instead of re-created per request.

use crate::middleware::IpRateLimiter;
use metrics_exporter_prometheus::PrometheusHandle;
use ragline_config::ApplicationConfig;
use ragline_jobs::JobService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Admission queue plus the job/message stores
    pub jobs: Arc<JobService>,
    pub config: Arc<ApplicationConfig>,
    /// Renders the Prometheus exposition at /metrics
    pub metrics: PrometheusHandle,
    pub limiter: Arc<IpRateLimiter>,
}

impl AppState {
    pub fn new(
        jobs: Arc<JobService>,
        config: Arc<ApplicationConfig>,
        metrics: PrometheusHandle,
    ) -> Self {
        let limiter = Arc::new(IpRateLimiter::new(&config.rate_limit));
        Self {
            jobs,
            config,
            metrics,
            limiter,
        }
    }
}
