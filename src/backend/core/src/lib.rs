#![allow(clippy::result_large_err)]
//! # Jobboard Core
//!
//! Job listing service for the flow dashboard.
//!
//! ## Architecture
//!
//! - **Jobs**: stored job rows, their flow-service key, and enriched rows
//! - **Storage**: paged, ordered job queries over PostgreSQL
//! - **Enrichment**: bounded, retrying, order-preserving fan-out to the flow service
//! - **API**: the `/job` HTTP surface consumed by the dashboard
//! - **Observability**: structured logging, OTLP tracing and Prometheus metrics

pub mod api;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod jobs;
pub mod observability;
pub mod pagination;

pub use error::{BoardError, ErrorCode, ErrorDetails, ErrorSeverity, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{build_router, ApiResponse, AppState};
    pub use crate::config::Config;
    pub use crate::db::{InMemoryJobStore, JobFilter, JobPageQuery, JobStore, OrderField, PgJobStore};
    pub use crate::enrichment::{
        AggregatorSettings, Backoff, FlowClient, FlowEnvelope, HttpFlowClient, PagedEnrichmentAggregator,
        RetryPolicy, WorkerPool, WorkerPoolConfig, WorkerPoolStats,
    };
    pub use crate::error::{BoardError, ErrorCode, ErrorDetails, ErrorSeverity, Result};
    pub use crate::jobs::{Enrichment, JobKey, JobPage, JobRecord, PairedResult};
    pub use crate::pagination::{Page, PageRequest, SortDirection};
}
