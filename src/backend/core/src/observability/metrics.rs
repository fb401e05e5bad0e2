//! Prometheus metrics.
//!
//! Metrics are recorded through the `metrics` facade everywhere in the
//! crate; this module installs the Prometheus recorder and describes them.

use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::enrichment::WorkerPoolStats;

/// Buckets for the page fan-out histogram (seconds).
const FANOUT_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Install the global Prometheus recorder.
///
/// Returns the handle that renders the scrape body for `/metrics`.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("jobboard_page_fanout_seconds".to_string()),
            FANOUT_BUCKETS,
        )?
        .install_recorder()?;

    register_metric_descriptions();

    Ok(handle)
}

fn register_metric_descriptions() {
    describe_counter!(
        "jobboard_enrichment_attempts_total",
        "Remote enrichment calls made, retries included"
    );
    describe_counter!(
        "jobboard_enrichment_outcomes_total",
        "Enriched rows by outcome (loaded, empty, failed)"
    );
    describe_histogram!(
        "jobboard_page_fanout_seconds",
        "Wall time to enrich one page"
    );
    describe_counter!("jobboard_errors_total", "Errors by code and category");

    describe_gauge!("jobboard_pool_active_workers", "Enrichment workers currently busy");
    describe_gauge!("jobboard_pool_queued", "Submissions waiting for an enrichment worker");
}

/// Publish worker pool gauges; called before each scrape.
pub fn record_pool_stats(stats: &WorkerPoolStats) {
    gauge!("jobboard_pool_active_workers").set(stats.active_workers as f64);
    gauge!("jobboard_pool_queued").set(stats.queued as f64);
}
