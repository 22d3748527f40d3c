use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process and describe the pipeline series.
    pub fn init(oracle_timeout_secs: u64) -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new().install_recorder()?;
                describe_counter!(
                    "hazard_analysis_total",
                    "Hazard analyses by outcome (success, soft_failure, hard_failure)."
                );
                describe_counter!("alerts_raised_total", "Alerts raised by source.");
                describe_counter!("trend_summaries_total", "Trend summaries by outcome.");
                describe_counter!(
                    "post_batch_failures_total",
                    "Posts left unanalyzed by a batch sweep."
                );
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();

        // Static gauge with the configured per-call oracle bound
        gauge!("oracle_timeout_secs").set(oracle_timeout_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
