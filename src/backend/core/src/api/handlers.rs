//! API request handlers.
//!
//! All handlers return `Result<_, BoardError>`; errors become the error
//! envelope through `IntoResponse for BoardError`.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::{ApiResponse, AppState};
use crate::db::{JobFilter, JobPageQuery, OrderField};
use crate::enrichment::call_once;
use crate::error::{BoardError, ErrorCode, Result};
use crate::jobs::{JobKey, JobPage, JobRecord, PairedResult};
use crate::observability::metrics::record_pool_stats;
use crate::pagination::{Page, PageRequest, SortDirection};

// ═══════════════════════════════════════════════════════════════════════════════
// Operational
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let pool = state.aggregator.pool();
    let status = if pool.is_healthy() { "healthy" } else { "degraded" };

    Json(serde_json::json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "workerPool": pool.stats(),
    }))
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => {
            record_pool_stats(&state.aggregator.pool().stats());
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        }
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "metrics exporter not installed".to_string(),
        ),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Queries
// ═══════════════════════════════════════════════════════════════════════════════

/// Optional ordering and filtering for the paged listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub order_field: Option<String>,
    pub order_type: Option<String>,
    pub job_id: Option<String>,
}

fn parse_page_number(field: &'static str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| BoardError::invalid_format(field, raw))
}

/// `GET /job/query/all/:totalRecord/:pageNum/:pageSize`
///
/// The `totalRecord` segment is accepted but ignored; the reported total
/// always comes from the count query.
pub async fn list_jobs(
    State(state): State<AppState>,
    Path((_total_record, page_num, page_size)): Path<(String, String, String)>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<JobPage>>> {
    let request = PageRequest::new(
        parse_page_number("pageNum", &page_num)?,
        parse_page_number("pageSize", &page_size)?,
    );
    request.validate()?;

    let order_field = params
        .order_field
        .as_deref()
        .map(OrderField::parse)
        .transpose()?
        .unwrap_or_default();
    let direction = params
        .order_type
        .as_deref()
        .map(SortDirection::parse)
        .transpose()?
        .unwrap_or_default();
    let filter = JobFilter { job_id: params.job_id };

    let (records, total) = if request.selects_nothing() {
        (Vec::new(), state.store.count_jobs(&filter).await?)
    } else {
        let query = JobPageQuery::new(request)
            .order_by(order_field, direction)
            .with_filter(filter.clone());
        tokio::try_join!(
            state.store.query_paged_jobs(&query),
            state.store.count_jobs(&filter)
        )?
    };

    tracing::debug!(
        page_num = request.page_num,
        page_size = request.page_size,
        rows = records.len(),
        total,
        "Job page loaded"
    );

    let list = state.aggregator.enrich_page(records).await;
    Ok(Json(ApiResponse::success(Page::new(request, list, total))))
}

/// `GET /job/query/totalrecord`
pub async fn count_jobs(State(state): State<AppState>) -> Result<Json<ApiResponse<u64>>> {
    let total = state.store.count_jobs(&JobFilter::default()).await?;
    Ok(Json(ApiResponse::success(total)))
}

/// `GET /job/query/status`
pub async fn running_jobs(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<JobRecord>>>> {
    let jobs = state.store.query_unfinished_jobs().await?;
    Ok(Json(ApiResponse::success(jobs)))
}

/// `GET /job/query/:jobId/:role/:partyId`
pub async fn get_job(
    State(state): State<AppState>,
    Path((job_id, role, party_id)): Path<(String, String, String)>,
) -> Result<Json<ApiResponse<PairedResult>>> {
    let key = JobKey::parse(&job_id, &role, &party_id)?;

    let record = state
        .store
        .find_job(&key)
        .await?
        .ok_or_else(|| BoardError::job_not_found(key.job_id(), key.role(), key.party_id()))?;

    let paired = state.aggregator.enrich_record(record).await;
    Ok(Json(ApiResponse::success(paired)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Flow Service Proxies
// ═══════════════════════════════════════════════════════════════════════════════

/// Party ids arrive as strings from some clients and as numbers from others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PartyIdField {
    Number(i64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct JobKeyRequest {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub party_id: Option<PartyIdField>,
}

impl JobKeyRequest {
    fn into_key(self) -> Result<JobKey> {
        let party_id = match self.party_id {
            Some(PartyIdField::Number(n)) => n.to_string(),
            Some(PartyIdField::Text(s)) => s,
            None => String::new(),
        };
        JobKey::parse(
            self.job_id.as_deref().unwrap_or_default(),
            self.role.as_deref().unwrap_or_default(),
            &party_id,
        )
    }
}

fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| BoardError::new(ErrorCode::InvalidInput, rejection.body_text()))
}

/// `POST /job/tracking/job/data_view`
pub async fn data_view(
    State(state): State<AppState>,
    body: std::result::Result<Json<JobKeyRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let key = json_body(body)?.into_key()?;

    let envelope = call_once(
        state.flow.as_ref(),
        &state.flow_config.data_view_path,
        &key.request_body(),
        state.flow_config.request_timeout,
    )
    .await?;

    Ok(Json(ApiResponse::success(
        envelope.data.unwrap_or(serde_json::Value::Null),
    )))
}

/// `POST /job/v1/pipeline/job/stop`
pub async fn stop_job(
    State(state): State<AppState>,
    body: std::result::Result<Json<JobKeyRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>> {
    let key = json_body(body)?.into_key()?;

    let envelope = call_once(
        state.flow.as_ref(),
        &state.flow_config.stop_path,
        &key.request_body(),
        state.flow_config.request_timeout,
    )
    .await?;

    tracing::info!(job = %key, "Stop requested");

    let message = if envelope.retmsg.is_empty() {
        "success".to_string()
    } else {
        envelope.retmsg
    };
    Ok(Json(ApiResponse::message(message)))
}
