//! Fan-out enrichment of job listings from the flow service.
//!
//! - [`WorkerPool`]: process-wide bound on concurrent remote calls
//! - [`RetryPolicy`]: bounded retries with backoff for transient failures
//! - [`FlowClient`]: the remote service seam
//! - [`PagedEnrichmentAggregator`]: order-preserving fan-out for one page

mod aggregator;
mod client;
mod retry;
mod worker_pool;

pub use aggregator::{AggregatorSettings, PagedEnrichmentAggregator};
pub use client::{call_once, FlowClient, FlowEnvelope, HttpFlowClient};
pub use retry::{attempts_made, Backoff, RetryPolicy};
pub use worker_pool::{WorkerPermit, WorkerPool, WorkerPoolConfig, WorkerPoolStats};
