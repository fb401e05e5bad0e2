//! HTTP API for the job dashboard.
//!
//! Every job endpoint lives under `/job` and answers with the envelope
//! `{code, message, data}`; `code` is 0 on success. Errors use the same
//! shape with a non-zero code and `data: null` (see [`crate::error`]).

mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::FlowConfig;
use crate::db::JobStore;
use crate::enrichment::{FlowClient, PagedEnrichmentAggregator};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub flow: Arc<dyn FlowClient>,
    pub aggregator: Arc<PagedEnrichmentAggregator>,
    pub flow_config: Arc<FlowConfig>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn JobStore>,
        flow: Arc<dyn FlowClient>,
        aggregator: Arc<PagedEnrichmentAggregator>,
        flow_config: FlowConfig,
    ) -> Self {
        Self {
            store,
            flow,
            aggregator,
            flow_config: Arc::new(flow_config),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .nest("/job", job_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

fn job_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/query/all/:total_record/:page_num/:page_size",
            get(handlers::list_jobs),
        )
        .route("/query/totalrecord", get(handlers::count_jobs))
        .route("/query/status", get(handlers::running_jobs))
        .route("/query/:job_id/:role/:party_id", get(handlers::get_job))
        .route("/tracking/job/data_view", post(handlers::data_view))
        .route("/v1/pipeline/job/stop", post(handlers::stop_job))
}

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always 0
    pub code: u32,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    /// A successful answer that carries only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let json = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["message"], "success");
        assert_eq!(json["data"], 42);
    }

    #[test]
    fn test_api_response_message_has_null_data() {
        let json = serde_json::to_value(ApiResponse::<()>::message("stopped")).unwrap();
        assert_eq!(json["code"], 0);
        assert!(json["data"].is_null());
    }
}
