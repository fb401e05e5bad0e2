//! Paged enrichment: one page of job records in, the same records paired
//! with their flow-service data out, in the same order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use metrics::{counter, histogram};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::client::FlowClient;
use super::retry::{attempts_made, RetryPolicy};
use super::worker_pool::WorkerPool;
use crate::config::{EnrichmentConfig, FlowConfig};
use crate::error::{BoardError, Result};
use crate::jobs::{Enrichment, JobKey, JobRecord, PairedResult};

/// Tunables for one aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Flow-service path queried for each record
    pub data_view_path: String,
    /// Bound on a single call; a timeout counts as a transient failure
    pub call_timeout: Duration,
    /// Bound on the whole fan-out for one page
    pub page_deadline: Duration,
    pub retry: RetryPolicy,
}

impl AggregatorSettings {
    pub fn from_config(flow: &FlowConfig, enrichment: &EnrichmentConfig) -> Self {
        Self {
            data_view_path: flow.data_view_path.clone(),
            call_timeout: flow.request_timeout,
            page_deadline: enrichment.page_deadline,
            retry: enrichment.retry_policy(),
        }
    }
}

/// Fans a page of records out over the shared worker pool.
///
/// Rows never fail the page: a record whose enrichment cannot be obtained
/// comes back as [`Enrichment::Failed`], which serializes as `null`.
pub struct PagedEnrichmentAggregator {
    pool: Arc<WorkerPool>,
    client: Arc<dyn FlowClient>,
    data_view_path: Arc<str>,
    settings: AggregatorSettings,
}

enum Pending {
    Running(JoinHandle<Result<Enrichment>>),
    Invalid(BoardError),
}

impl PagedEnrichmentAggregator {
    pub fn new(pool: Arc<WorkerPool>, client: Arc<dyn FlowClient>, settings: AggregatorSettings) -> Self {
        Self {
            pool,
            client,
            data_view_path: Arc::from(settings.data_view_path.as_str()),
            settings,
        }
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Enrich every record on the page.
    ///
    /// The output has exactly one entry per input record, at the same index.
    /// Returns once every row has an outcome or the page deadline passes;
    /// rows still outstanding at the deadline are cancelled and marked failed.
    #[instrument(skip_all, fields(page_id = %Uuid::new_v4(), records = records.len()))]
    pub async fn enrich_page(&self, records: Vec<JobRecord>) -> Vec<PairedResult> {
        if records.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.settings.page_deadline;

        let pending: Vec<Pending> = records
            .iter()
            .map(|record| match JobKey::from_record(record) {
                Ok(key) => Pending::Running(self.pool.submit(fetch_enrichment(
                    self.client.clone(),
                    self.data_view_path.clone(),
                    key,
                    self.settings.retry.clone(),
                    self.settings.call_timeout,
                ))),
                Err(err) => Pending::Invalid(err),
            })
            .collect();

        let outcomes = join_all(pending.into_iter().map(|slot| settle(slot, deadline, self.settings.page_deadline))).await;

        let elapsed = started.elapsed();
        histogram!("jobboard_page_fanout_seconds").record(elapsed.as_secs_f64());

        let failed = outcomes.iter().filter(|e| e.is_failed()).count();
        info!(
            rows = outcomes.len(),
            failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Page enrichment finished"
        );

        records
            .into_iter()
            .zip(outcomes)
            .map(|(record, enrichment)| PairedResult::new(record, enrichment))
            .collect()
    }

    /// Enrich a single record, under the same rules as a page of one.
    pub async fn enrich_record(&self, record: JobRecord) -> PairedResult {
        let fallback = record.clone();
        self.enrich_page(vec![record])
            .await
            .pop()
            .unwrap_or_else(|| PairedResult::new(fallback, Enrichment::Empty))
    }
}

/// Wait for one row's task, bounded by the shared page deadline.
async fn settle(slot: Pending, deadline: tokio::time::Instant, page_deadline: Duration) -> Enrichment {
    let enrichment = match slot {
        Pending::Invalid(err) => {
            warn!(error = %err, "Skipping enrichment for record with invalid key");
            Enrichment::Failed {
                reason: err.user_message().to_string(),
                attempts: 0,
            }
        }
        Pending::Running(mut handle) => match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(Ok(enrichment))) => enrichment,
            Ok(Ok(Err(err))) => Enrichment::Failed {
                reason: err.user_message().to_string(),
                attempts: attempts_made(&err),
            },
            Ok(Err(join_err)) => Enrichment::Failed {
                reason: format!("enrichment task aborted: {}", join_err),
                attempts: 0,
            },
            Err(_) => {
                handle.abort();
                let err = BoardError::page_deadline_exceeded(page_deadline);
                Enrichment::Failed {
                    reason: err.user_message().to_string(),
                    attempts: 0,
                }
            }
        },
    };

    let outcome = match &enrichment {
        Enrichment::Loaded(_) => "loaded",
        Enrichment::Empty => "empty",
        Enrichment::Failed { .. } => "failed",
    };
    counter!("jobboard_enrichment_outcomes_total", "outcome" => outcome).increment(1);

    enrichment
}

/// Fetch one record's data view, retrying transient failures.
async fn fetch_enrichment(
    client: Arc<dyn FlowClient>,
    path: Arc<str>,
    key: JobKey,
    retry: RetryPolicy,
    call_timeout: Duration,
) -> Result<Enrichment> {
    let body = key.request_body();
    let operation = key.to_string();

    let client = &*client;
    let path = &*path;
    let body = &body;

    let result = retry
        .run(&operation, || async move {
            counter!("jobboard_enrichment_attempts_total").increment(1);
            let raw = tokio::time::timeout(call_timeout, client.post(path, body)).await??;
            let parsed: serde_json::Value = serde_json::from_str(&raw)?;
            Ok(Enrichment::from_response(parsed))
        })
        .await;

    match &result {
        Ok(_) => debug!(job = %key, "Enrichment loaded"),
        Err(err) => warn!(
            job = %key,
            attempts = attempts_made(err),
            error = %err,
            "Enrichment failed"
        ),
    }

    result
}
