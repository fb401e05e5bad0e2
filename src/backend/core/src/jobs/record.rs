//! Job rows as stored locally, and the identifying key used to address
//! them on the flow service.

use serde::{Deserialize, Serialize};

use crate::error::{BoardError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// Job Record
// ═══════════════════════════════════════════════════════════════════════════════

/// A job row from the `t_job` table.
///
/// Timestamps are epoch milliseconds, as written by the flow service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[sqlx(rename = "f_job_id")]
    pub job_id: String,
    #[sqlx(rename = "f_name")]
    pub name: Option<String>,
    #[sqlx(rename = "f_description")]
    pub description: Option<String>,
    #[sqlx(rename = "f_tag")]
    pub tag: Option<String>,
    #[sqlx(rename = "f_role")]
    pub role: String,
    #[sqlx(rename = "f_party_id")]
    pub party_id: String,
    #[sqlx(rename = "f_roles")]
    pub roles: Option<String>,
    #[sqlx(rename = "f_initiator_party_id")]
    pub initiator_party_id: Option<String>,
    #[sqlx(rename = "f_is_initiator")]
    pub is_initiator: Option<bool>,
    #[sqlx(rename = "f_progress")]
    pub progress: Option<i32>,
    #[sqlx(rename = "f_dsl")]
    pub dsl: Option<String>,
    #[sqlx(rename = "f_runtime_conf")]
    pub runtime_conf: Option<String>,
    #[sqlx(rename = "f_run_ip")]
    pub run_ip: Option<String>,
    #[sqlx(rename = "f_status")]
    pub status: Option<String>,
    #[sqlx(rename = "f_create_time")]
    pub create_time: Option<i64>,
    #[sqlx(rename = "f_update_time")]
    pub update_time: Option<i64>,
    #[sqlx(rename = "f_start_time")]
    pub start_time: Option<i64>,
    #[sqlx(rename = "f_end_time")]
    pub end_time: Option<i64>,
    #[sqlx(rename = "f_elapsed")]
    pub elapsed: Option<i64>,
}

impl JobRecord {
    /// A record carrying only its identifying fields.
    pub fn new(job_id: impl Into<String>, role: impl Into<String>, party_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            role: role.into(),
            party_id: party_id.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_start_time(mut self, start_time: i64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Whether the flow service still considers this job live.
    pub fn is_unfinished(&self) -> bool {
        matches!(
            self.status.as_deref(),
            Some(status) if UNFINISHED_STATUSES.contains(&status)
        )
    }
}

/// Statuses reported by `/job/query/status`.
pub const UNFINISHED_STATUSES: [&str; 2] = ["waiting", "running"];

// ═══════════════════════════════════════════════════════════════════════════════
// Job Key
// ═══════════════════════════════════════════════════════════════════════════════

/// The `(job_id, role, party_id)` triple that identifies a job on one party.
///
/// Construction validates the triple; a `JobKey` always has non-blank
/// strings and an integer party id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobKey {
    job_id: String,
    role: String,
    party_id: i64,
}

impl JobKey {
    /// Validate raw request values.
    pub fn parse(job_id: &str, role: &str, party_id: &str) -> Result<Self> {
        let job_id = job_id.trim();
        let role = role.trim();
        let party_id = party_id.trim();

        if job_id.is_empty() {
            return Err(BoardError::missing_field("job_id"));
        }
        if role.is_empty() {
            return Err(BoardError::missing_field("role"));
        }
        if party_id.is_empty() {
            return Err(BoardError::missing_field("party_id"));
        }
        let party_id = party_id
            .parse::<i64>()
            .map_err(|_| BoardError::invalid_format("party_id", party_id))?;

        Ok(Self {
            job_id: job_id.to_string(),
            role: role.to_string(),
            party_id,
        })
    }

    pub fn from_record(record: &JobRecord) -> Result<Self> {
        Self::parse(&record.job_id, &record.role, &record.party_id)
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn party_id(&self) -> i64 {
        self.party_id
    }

    /// JSON body sent to the flow service for this job.
    pub fn request_body(&self) -> serde_json::Value {
        serde_json::json!({
            "job_id": self.job_id,
            "role": self.role,
            "party_id": self.party_id,
        })
    }
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.job_id, self.role, self.party_id)
    }
}
