//! Shared fixtures: a scripted flow service and aggregator builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobboard_core::enrichment::{
    AggregatorSettings, Backoff, FlowClient, PagedEnrichmentAggregator, RetryPolicy, WorkerPool,
    WorkerPoolConfig,
};
use jobboard_core::error::{BoardError, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// How the fake flow service answers for one job id.
#[derive(Debug, Clone)]
pub enum Script {
    /// `{"retcode": 0, "data": <value>}`
    Data(Value),
    /// `{"retcode": 0}` with no data
    NoData,
    /// Answers with this exact envelope
    Envelope(Value),
    /// HTTP 503
    Transient,
    /// HTTP 404
    Permanent,
    /// Not JSON at all
    Malformed,
    /// Fails transiently this many times, then returns the data
    FlakyThen(u32, Value),
    /// Sleeps, then returns the data
    Delayed(Duration, Value),
    /// Never answers in any reasonable time
    Hang,
}

/// In-process [`FlowClient`] that answers from a per-job script.
#[derive(Default)]
pub struct ScriptedFlowClient {
    scripts: HashMap<String, Script>,
    calls: Mutex<HashMap<String, u32>>,
    requests: Mutex<Vec<(String, Vec<u8>)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedFlowClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, job_id: &str, script: Script) -> Self {
        self.scripts.insert(job_id.to_string(), script);
        self
    }

    /// Calls made for `job_id`, retries included.
    pub fn calls(&self, job_id: &str) -> u32 {
        self.calls.lock().get(job_id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().values().sum()
    }

    /// Serialized request bodies, in arrival order, with their path.
    pub fn requests(&self) -> Vec<(String, Vec<u8>)> {
        self.requests.lock().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn success(data: Option<&Value>) -> String {
        match data {
            Some(data) => json!({"retcode": 0, "retmsg": "success", "data": data}).to_string(),
            None => json!({"retcode": 0, "retmsg": "success"}).to_string(),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FlowClient for ScriptedFlowClient {
    async fn post(&self, path: &str, body: &Value) -> Result<String> {
        let job_id = body["job_id"].as_str().unwrap_or_default().to_string();
        let call = {
            let mut calls = self.calls.lock();
            let n = calls.entry(job_id.clone()).or_insert(0);
            *n += 1;
            *n
        };
        self.requests
            .lock()
            .push((path.to_string(), serde_json::to_vec(body).unwrap()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        match self.scripts.get(&job_id).cloned().unwrap_or(Script::NoData) {
            Script::Data(data) => Ok(Self::success(Some(&data))),
            Script::NoData => Ok(Self::success(None)),
            Script::Envelope(envelope) => Ok(envelope.to_string()),
            Script::Transient => Err(BoardError::upstream_status(503, "unavailable")),
            Script::Permanent => Err(BoardError::upstream_status(404, "no such route")),
            Script::Malformed => Ok("<html>bad gateway</html>".to_string()),
            Script::FlakyThen(failures, data) => {
                if call <= failures {
                    Err(BoardError::upstream_status(502, "flaky"))
                } else {
                    Ok(Self::success(Some(&data)))
                }
            }
            Script::Delayed(delay, data) => {
                tokio::time::sleep(delay).await;
                Ok(Self::success(Some(&data)))
            }
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Self::success(None))
            }
        }
    }
}

/// Settings with no backoff so tests don't sleep between retries.
pub fn fast_settings() -> AggregatorSettings {
    AggregatorSettings {
        data_view_path: "/v1/tracking/job/data_view".to_string(),
        call_timeout: Duration::from_secs(5),
        page_deadline: Duration::from_secs(30),
        retry: RetryPolicy {
            max_retries: 3,
            backoff: Backoff::none(),
        },
    }
}

pub fn pool(workers: usize) -> Arc<WorkerPool> {
    Arc::new(WorkerPool::new(WorkerPoolConfig {
        max_workers: workers,
        queue_capacity: 1024,
        acquire_timeout: Duration::from_secs(60),
        name: "test".to_string(),
    }))
}

pub fn aggregator(
    client: Arc<ScriptedFlowClient>,
    workers: usize,
    settings: AggregatorSettings,
) -> PagedEnrichmentAggregator {
    PagedEnrichmentAggregator::new(pool(workers), client, settings)
}
