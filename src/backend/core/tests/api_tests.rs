//! Tests for the `/job` HTTP surface.
//!
//! Tests cover:
//! - Paged listing with enrichment, ordering, filtering and empty pages
//! - Input validation and storage failures
//! - Job detail, count and running-job queries
//! - Flow-service proxies (data view, stop)
//! - Health and metrics endpoints

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::{aggregator, fast_settings, Script, ScriptedFlowClient};
use jobboard_core::api::{build_router, AppState};
use jobboard_core::config::FlowConfig;
use jobboard_core::db::{InMemoryJobStore, JobFilter, JobPageQuery, JobStore};
use jobboard_core::error::{BoardError, Result};
use jobboard_core::jobs::{JobKey, JobRecord};
use serde_json::{json, Value};
use tower::ServiceExt;

fn sample_jobs() -> Vec<JobRecord> {
    vec![
        JobRecord::new("j1", "guest", "10").with_start_time(100).with_status("success"),
        JobRecord::new("j2", "host", "20").with_start_time(300).with_status("running"),
        JobRecord::new("j3", "guest", "10").with_start_time(200).with_status("waiting"),
    ]
}

fn app_with(store: Arc<dyn JobStore>, client: Arc<ScriptedFlowClient>) -> Router {
    let agg = Arc::new(aggregator(client.clone(), 4, fast_settings()));
    build_router(AppState::new(store, client, agg, FlowConfig::default()))
}

fn app(client: Arc<ScriptedFlowClient>) -> Router {
    app_with(Arc::new(InMemoryJobStore::new(sample_jobs())), client)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// A store whose every query fails as if the database were down.
struct UnavailableStore;

#[async_trait]
impl JobStore for UnavailableStore {
    async fn query_paged_jobs(&self, _query: &JobPageQuery) -> Result<Vec<JobRecord>> {
        Err(BoardError::from(sqlx::Error::PoolTimedOut))
    }

    async fn count_jobs(&self, _filter: &JobFilter) -> Result<u64> {
        Err(BoardError::from(sqlx::Error::PoolTimedOut))
    }

    async fn query_unfinished_jobs(&self) -> Result<Vec<JobRecord>> {
        Err(BoardError::from(sqlx::Error::PoolTimedOut))
    }

    async fn find_job(&self, _key: &JobKey) -> Result<Option<JobRecord>> {
        Err(BoardError::from(sqlx::Error::PoolTimedOut))
    }
}

// ============================================================================
// Paged Listing
// ============================================================================

#[tokio::test]
async fn test_list_jobs_enriches_page_newest_first() {
    let client = Arc::new(
        ScriptedFlowClient::new()
            .script("j2", Script::Data(json!({"progress": 40})))
            .script("j3", Script::Transient),
    );

    let (status, body) = get(app(client.clone()), "/job/query/all/0/1/2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    let page = &body["data"];
    assert_eq!(page["pageNum"], 1);
    assert_eq!(page["pageSize"], 2);
    assert_eq!(page["totalRecord"], 3);
    assert_eq!(page["totalPage"], 2);

    let list = page["list"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["job"]["jobId"], "j2");
    assert_eq!(list[0]["dataset"], json!({"progress": 40}));
    assert_eq!(list[1]["job"]["jobId"], "j3");
    assert!(list[1]["dataset"].is_null());
    assert_eq!(client.calls("j1"), 0);
}

#[tokio::test]
async fn test_list_jobs_ignores_path_total_record() {
    let client = Arc::new(ScriptedFlowClient::new());

    let (_, body) = get(app(client), "/job/query/all/999/1/10").await;

    assert_eq!(body["data"]["totalRecord"], 3);
}

#[tokio::test]
async fn test_list_jobs_zero_page_size_reports_total_without_fetching() {
    let client = Arc::new(ScriptedFlowClient::new());

    let (status, body) = get(app(client.clone()), "/job/query/all/0/1/0").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["list"], json!([]));
    assert_eq!(body["data"]["totalRecord"], 3);
    assert_eq!(client.total_calls(), 0);
}

#[tokio::test]
async fn test_list_jobs_out_of_range_page_is_empty() {
    let client = Arc::new(ScriptedFlowClient::new());

    let (status, body) = get(app(client.clone()), "/job/query/all/0/5/10").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["list"], json!([]));
    assert_eq!(body["data"]["totalRecord"], 3);
    assert_eq!(client.total_calls(), 0);
}

#[tokio::test]
async fn test_list_jobs_ordering_and_filter_params() {
    let client = Arc::new(ScriptedFlowClient::new());

    let (_, body) = get(
        app(client.clone()),
        "/job/query/all/0/1/10?orderField=startTime&orderType=asc",
    )
    .await;
    let ids: Vec<&str> = body["data"]["list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["job"]["jobId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["j1", "j3", "j2"]);

    let (_, body) = get(app(client), "/job/query/all/0/1/10?jobId=j3").await;
    assert_eq!(body["data"]["totalRecord"], 1);
    assert_eq!(body["data"]["list"][0]["job"]["jobId"], "j3");
}

#[tokio::test]
async fn test_list_jobs_rejects_bad_paging() {
    let client = Arc::new(ScriptedFlowClient::new());

    let (status, body) = get(app(client.clone()), "/job/query/all/0/abc/10").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_ne!(body["code"], 0);
    assert!(body["data"].is_null());

    let (status, _) = get(app(client.clone()), "/job/query/all/0/1/10?orderType=sideways").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get(app(client.clone()), "/job/query/all/0/1/10?orderField=f_dsl").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(client.total_calls(), 0);
}

#[tokio::test]
async fn test_storage_failure_aborts_before_any_enrichment() {
    let client = Arc::new(ScriptedFlowClient::new());

    let (status, body) = get(
        app_with(Arc::new(UnavailableStore), client.clone()),
        "/job/query/all/0/1/10",
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_ne!(body["code"], 0);
    assert_eq!(client.total_calls(), 0);
}

// ============================================================================
// Other Queries
// ============================================================================

#[tokio::test]
async fn test_total_record() {
    let (status, body) = get(app(Arc::new(ScriptedFlowClient::new())), "/job/query/totalrecord").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], 3);
}

#[tokio::test]
async fn test_running_jobs() {
    let (_, body) = get(app(Arc::new(ScriptedFlowClient::new())), "/job/query/status").await;

    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|job| job["jobId"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"j2"));
    assert!(ids.contains(&"j3"));
}

#[tokio::test]
async fn test_job_detail() {
    let client = Arc::new(ScriptedFlowClient::new().script("j2", Script::Data(json!({"f_status": "running"}))));

    let (status, body) = get(app(client), "/job/query/j2/host/20").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["job"]["jobId"], "j2");
    assert_eq!(body["data"]["dataset"]["f_status"], "running");
}

#[tokio::test]
async fn test_job_detail_not_found() {
    let (status, body) = get(app(Arc::new(ScriptedFlowClient::new())), "/job/query/nope/host/20").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 1000);
    assert_eq!(body["error_code"], "JOB_NOT_FOUND");
}

#[tokio::test]
async fn test_job_detail_rejects_non_integer_party() {
    let client = Arc::new(ScriptedFlowClient::new());

    let (status, body) = get(app(client.clone()), "/job/query/j2/host/twenty").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_ne!(body["code"], 0);
    assert_eq!(client.total_calls(), 0);
}

// ============================================================================
// Flow Service Proxies
// ============================================================================

#[tokio::test]
async fn test_data_view_proxy_success() {
    let client = Arc::new(ScriptedFlowClient::new().script(
        "j1",
        Script::Envelope(json!({"retcode": 0, "retmsg": "success", "data": {"dataset": "breast"}})),
    ));

    let (status, body) = post(
        app(client.clone()),
        "/job/tracking/job/data_view",
        json!({"job_id": "j1", "role": "guest", "party_id": "10"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["dataset"], "breast");

    let (path, sent) = &client.requests()[0];
    assert_eq!(path, "/v1/tracking/job/data_view");
    let sent: Value = serde_json::from_slice(sent).unwrap();
    assert_eq!(sent["party_id"], 10);
}

#[tokio::test]
async fn test_data_view_proxy_accepts_numeric_party() {
    let client = Arc::new(ScriptedFlowClient::new());

    let (status, _) = post(
        app(client.clone()),
        "/job/tracking/job/data_view",
        json!({"job_id": "j1", "role": "guest", "party_id": 10}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(client.calls("j1"), 1);
}

#[tokio::test]
async fn test_data_view_proxy_translates_remote_error() {
    let client = Arc::new(ScriptedFlowClient::new().script(
        "j1",
        Script::Envelope(json!({"retcode": 100, "retmsg": "job not found in flow"})),
    ));

    let (status, body) = post(
        app(client),
        "/job/tracking/job/data_view",
        json!({"job_id": "j1", "role": "guest", "party_id": 10}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_ne!(body["code"], 0);
    assert_eq!(body["message"], "job not found in flow");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_data_view_proxy_requires_role() {
    let client = Arc::new(ScriptedFlowClient::new());

    let (status, _) = post(
        app(client.clone()),
        "/job/tracking/job/data_view",
        json!({"job_id": "j1", "party_id": 10}),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(client.total_calls(), 0);
}

#[tokio::test]
async fn test_stop_job_is_sent_once() {
    let client = Arc::new(ScriptedFlowClient::new().script(
        "j2",
        Script::Envelope(json!({"retcode": 0, "retmsg": "stopped"})),
    ));

    let (status, body) = post(
        app(client.clone()),
        "/job/v1/pipeline/job/stop",
        json!({"job_id": "j2", "role": "host", "party_id": 20}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["message"], "stopped");
    assert_eq!(client.calls("j2"), 1);
    assert_eq!(client.requests()[0].0, "/v1/job/stop");
}

#[tokio::test]
async fn test_stop_job_transient_failure_is_not_retried() {
    let client = Arc::new(ScriptedFlowClient::new().script("j2", Script::Transient));

    let (status, _) = post(
        app(client.clone()),
        "/job/v1/pipeline/job/stop",
        json!({"job_id": "j2", "role": "host", "party_id": 20}),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(client.calls("j2"), 1);
}

// ============================================================================
// Operational
// ============================================================================

#[tokio::test]
async fn test_health_reports_worker_pool() {
    let (status, body) = get(app(Arc::new(ScriptedFlowClient::new())), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["workerPool"]["maxWorkers"], 4);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let response = app(Arc::new(ScriptedFlowClient::new()))
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
