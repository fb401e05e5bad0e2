//! Job queries.

use std::cmp::Ordering;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{BoardError, Result};
use crate::jobs::{JobKey, JobRecord, UNFINISHED_STATUSES};
use crate::pagination::{PageRequest, SortDirection};

const JOB_COLUMNS: &str = r#"
    f_job_id, f_name, f_description, f_tag, f_role, f_party_id, f_roles,
    f_initiator_party_id, f_is_initiator, f_progress, f_dsl, f_runtime_conf,
    f_run_ip, f_status, f_create_time, f_update_time, f_start_time,
    f_end_time, f_elapsed
"#;

/// Matches one job by key. `f_party_id` is text, so it is compared as a
/// number; values that are not integers never match.
const FIND_JOB_PREDICATE: &str = r#"
    f_job_id = $1
    AND f_role = $2
    AND CASE
        WHEN btrim(f_party_id) ~ '^[+-]?[0-9]{1,18}$' THEN btrim(f_party_id)::bigint
    END = $3
"#;

// ═══════════════════════════════════════════════════════════════════════════════
// Query Types
// ═══════════════════════════════════════════════════════════════════════════════

/// Columns the listing may be ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderField {
    #[default]
    StartTime,
    CreateTime,
    UpdateTime,
    JobId,
}

impl OrderField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::StartTime => "f_start_time",
            Self::CreateTime => "f_create_time",
            Self::UpdateTime => "f_update_time",
            Self::JobId => "f_job_id",
        }
    }

    /// Accepts the camelCase field name or the column name.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim() {
            "startTime" | "f_start_time" => Ok(Self::StartTime),
            "createTime" | "f_create_time" => Ok(Self::CreateTime),
            "updateTime" | "f_update_time" => Ok(Self::UpdateTime),
            "jobId" | "f_job_id" => Ok(Self::JobId),
            other => Err(BoardError::invalid_format("orderField", other)),
        }
    }

    fn compare(&self, a: &JobRecord, b: &JobRecord) -> Ordering {
        match self {
            Self::StartTime => a.start_time.cmp(&b.start_time),
            Self::CreateTime => a.create_time.cmp(&b.create_time),
            Self::UpdateTime => a.update_time.cmp(&b.update_time),
            Self::JobId => a.job_id.cmp(&b.job_id),
        }
    }
}

/// Optional listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    /// Substring of the job id
    pub job_id: Option<String>,
}

impl JobFilter {
    pub fn job_id(fragment: impl Into<String>) -> Self {
        Self {
            job_id: Some(fragment.into()),
        }
    }

    /// The job id fragment, with blank treated as absent.
    fn job_id_fragment(&self) -> Option<&str> {
        self.job_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn matches(&self, record: &JobRecord) -> bool {
        self.job_id_fragment()
            .map_or(true, |fragment| record.job_id.contains(fragment))
    }
}

/// One page worth of rows, in storage terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPageQuery {
    pub offset: i64,
    pub limit: i64,
    pub order_field: OrderField,
    pub direction: SortDirection,
    pub filter: JobFilter,
}

impl JobPageQuery {
    pub fn new(request: PageRequest) -> Self {
        Self {
            offset: i64::try_from(request.start_index()).unwrap_or(i64::MAX),
            limit: i64::try_from(request.limit()).unwrap_or(i64::MAX),
            order_field: OrderField::default(),
            direction: SortDirection::default(),
            filter: JobFilter::default(),
        }
    }

    pub fn order_by(mut self, field: OrderField, direction: SortDirection) -> Self {
        self.order_field = field;
        self.direction = direction;
        self
    }

    pub fn with_filter(mut self, filter: JobFilter) -> Self {
        self.filter = filter;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Read access to job records.
///
/// Implementations must be safe for concurrent reads; the listing runs the
/// page query and the count query at the same time.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn query_paged_jobs(&self, query: &JobPageQuery) -> Result<Vec<JobRecord>>;

    /// Total rows matching `filter`, independent of paging.
    async fn count_jobs(&self, filter: &JobFilter) -> Result<u64>;

    /// Jobs still waiting or running, newest first.
    async fn query_unfinished_jobs(&self) -> Result<Vec<JobRecord>>;

    async fn find_job(&self, key: &JobKey) -> Result<Option<JobRecord>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// PostgreSQL
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn query_paged_jobs(&self, query: &JobPageQuery) -> Result<Vec<JobRecord>> {
        // Column and direction come from enums, never from request text
        let sql = format!(
            r#"
            SELECT {columns}
            FROM t_job
            WHERE ($1::text IS NULL OR strpos(f_job_id, $1) > 0)
            ORDER BY {column} {direction} NULLS LAST, f_job_id
            LIMIT $2 OFFSET $3
            "#,
            columns = JOB_COLUMNS,
            column = query.order_field.column(),
            direction = query.direction.sql_keyword(),
        );

        let rows = sqlx::query_as::<_, JobRecord>(&sql)
            .bind(query.filter.job_id_fragment())
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn count_jobs(&self, filter: &JobFilter) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM t_job WHERE ($1::text IS NULL OR strpos(f_job_id, $1) > 0)",
        )
        .bind(filter.job_id_fragment())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn query_unfinished_jobs(&self) -> Result<Vec<JobRecord>> {
        let sql = format!(
            r#"
            SELECT {columns}
            FROM t_job
            WHERE f_status = ANY($1)
            ORDER BY f_create_time DESC NULLS LAST, f_job_id
            "#,
            columns = JOB_COLUMNS,
        );

        let statuses: Vec<String> = UNFINISHED_STATUSES.iter().map(|s| s.to_string()).collect();
        let rows = sqlx::query_as::<_, JobRecord>(&sql)
            .bind(statuses)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn find_job(&self, key: &JobKey) -> Result<Option<JobRecord>> {
        let sql = format!(
            r#"
            SELECT {columns}
            FROM t_job
            WHERE {predicate}
            LIMIT 1
            "#,
            columns = JOB_COLUMNS,
            predicate = FIND_JOB_PREDICATE,
        );

        let row = sqlx::query_as::<_, JobRecord>(&sql)
            .bind(key.job_id())
            .bind(key.role())
            .bind(key.party_id())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-Memory
// ═══════════════════════════════════════════════════════════════════════════════

/// A `JobStore` over a vector, for tests and local runs without Postgres.
#[derive(Default)]
pub struct InMemoryJobStore {
    records: RwLock<Vec<JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new(records: Vec<JobRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn insert(&self, record: JobRecord) {
        self.records.write().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

/// `None` sorts last in both directions, ties broken by job id.
fn compare_records(field: OrderField, direction: SortDirection, a: &JobRecord, b: &JobRecord) -> Ordering {
    let nulls = |r: &JobRecord| match field {
        OrderField::StartTime => r.start_time.is_none(),
        OrderField::CreateTime => r.create_time.is_none(),
        OrderField::UpdateTime => r.update_time.is_none(),
        OrderField::JobId => false,
    };

    nulls(a)
        .cmp(&nulls(b))
        .then_with(|| match direction {
            SortDirection::Asc => field.compare(a, b),
            SortDirection::Desc => field.compare(b, a),
        })
        .then_with(|| a.job_id.cmp(&b.job_id))
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn query_paged_jobs(&self, query: &JobPageQuery) -> Result<Vec<JobRecord>> {
        let mut rows: Vec<JobRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| query.filter.matches(r))
            .cloned()
            .collect();

        rows.sort_by(|a, b| compare_records(query.order_field, query.direction, a, b));

        Ok(rows
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect())
    }

    async fn count_jobs(&self, filter: &JobFilter) -> Result<u64> {
        Ok(self.records.read().iter().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn query_unfinished_jobs(&self) -> Result<Vec<JobRecord>> {
        let mut rows: Vec<JobRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| r.is_unfinished())
            .cloned()
            .collect();

        rows.sort_by(|a, b| compare_records(OrderField::CreateTime, SortDirection::Desc, a, b));
        Ok(rows)
    }

    async fn find_job(&self, key: &JobKey) -> Result<Option<JobRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| {
                r.job_id == key.job_id()
                    && r.role == key.role()
                    && r.party_id.trim().parse::<i64>().ok() == Some(key.party_id())
            })
            .cloned())
    }
}
