//! Job commands.
//!
//! Paged listing with live enrichment, single-job detail, running jobs,
//! counts, and the flow-service proxies (data view, stop).

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::commands::config;
use crate::output::{self, Notice, OutputFormat, Section};

const DEFAULT_PAGE_SIZE: u64 = 20;

#[derive(Subcommand)]
pub enum JobCommands {
    /// List one page of jobs with their live data
    List {
        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: u64,

        /// Rows per page (defaults to the configured page-size, then 20)
        #[arg(short, long)]
        size: Option<u64>,

        /// Sort column
        #[arg(long, value_enum, default_value = "start-time")]
        order_field: SortField,

        /// Sort direction
        #[arg(long, value_enum, default_value = "desc")]
        order: SortOrder,

        /// Only jobs whose id contains this text
        #[arg(long)]
        job_id: Option<String>,
    },

    /// Show one job and its live data
    Get(JobKeyArgs),

    /// List jobs that are waiting or running
    Running,

    /// Count all stored jobs
    Count,

    /// Fetch the flow service's data view for a job
    DataView(JobKeyArgs),

    /// Ask the flow service to stop a job
    Stop {
        #[command(flatten)]
        key: JobKeyArgs,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Serialize)]
pub struct JobKeyArgs {
    /// Job id
    job_id: String,
    /// Role (guest, host, arbiter)
    role: String,
    /// Party id
    party_id: i64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortField {
    StartTime,
    CreateTime,
    UpdateTime,
    JobId,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortField {
    fn as_param(&self) -> &'static str {
        match self {
            Self::StartTime => "startTime",
            Self::CreateTime => "createTime",
            Self::UpdateTime => "updateTime",
            Self::JobId => "jobId",
        }
    }
}

// ── API types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    job_id: String,
    role: String,
    party_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    progress: Option<i32>,
    #[serde(default)]
    start_time: Option<i64>,
    #[serde(default)]
    end_time: Option<i64>,
    #[serde(default)]
    elapsed: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize)]
struct EnrichedJob {
    job: Job,
    dataset: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobPage {
    list: Vec<EnrichedJob>,
    page_num: u64,
    page_size: u64,
    total_record: u64,
    total_page: u64,
}

#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    #[tabled(rename = "Job ID")]
    job_id: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Party")]
    party_id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Started")]
    started: String,
    #[tabled(rename = "Live Data")]
    live: String,
}

impl JobRow {
    fn new(job: &Job, dataset: Option<&Option<serde_json::Value>>) -> Self {
        let status = job.status.as_deref().unwrap_or("-");
        Self {
            job_id: job.job_id.clone(),
            role: job.role.clone(),
            party_id: job.party_id.clone(),
            status: output::colored_status(status),
            progress: job
                .progress
                .map(|p| format!("{}%", p))
                .unwrap_or_else(|| "-".to_string()),
            started: output::format_millis(job.start_time),
            live: match dataset {
                None => "-".to_string(),
                Some(Some(_)) => "yes".to_string(),
                Some(None) => "unavailable".to_string(),
            },
        }
    }
}

fn job_section(job: &Job) -> Section {
    Section::new(format!("Job {}", job.job_id))
        .field("Role", job.role.as_str())
        .field("Party", job.party_id.as_str())
        .field("Name", job.name.as_deref().unwrap_or("-"))
        .field("Status", output::colored_status(job.status.as_deref().unwrap_or("-")))
        .field_if("Progress", job.progress.map(|p| format!("{}%", p)))
        .field("Started", output::format_millis(job.start_time))
        .field("Ended", output::format_millis(job.end_time))
        .field_if("Elapsed", job.elapsed.map(output::format_elapsed))
}

pub async fn execute(cmd: JobCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        JobCommands::List {
            page,
            size,
            order_field,
            order,
            job_id,
        } => {
            let size = size
                .or_else(config::load_page_size)
                .unwrap_or(DEFAULT_PAGE_SIZE);

            let mut query = vec![
                ("orderField", order_field.as_param().to_string()),
                (
                    "orderType",
                    match order {
                        SortOrder::Asc => "asc",
                        SortOrder::Desc => "desc",
                    }
                    .to_string(),
                ),
            ];
            if let Some(fragment) = job_id {
                query.push(("jobId", fragment));
            }

            // The first segment is a total hint the server ignores
            let path = format!("/job/query/all/0/{}/{}", page, size);
            let page: JobPage = client
                .get_optional(&path, &query)
                .await?
                .ok_or_else(|| anyhow::anyhow!("API returned success but no data"))?;

            match format {
                OutputFormat::Table => {
                    let rows: Vec<JobRow> = page
                        .list
                        .iter()
                        .map(|row| JobRow::new(&row.job, Some(&row.dataset)))
                        .collect();
                    output::print_rows(&rows, format)?;
                    println!(
                        "Page {}/{} ({} jobs)",
                        page.page_num, page.total_page, page.total_record
                    );
                }
                _ => output::print_document(&page, format)?,
            }
        }

        JobCommands::Get(key) => {
            let path = format!("/job/query/{}/{}/{}", key.job_id, key.role, key.party_id);
            let job: EnrichedJob = client.get(&path).await?;

            match format {
                OutputFormat::Table => {
                    job_section(&job.job).print();
                    match &job.dataset {
                        Some(data) => {
                            Section::new("Live Data").print();
                            output::print_document(data, OutputFormat::Json)?;
                        }
                        None => output::notice(Notice::Info, "Live data unavailable"),
                    }
                }
                _ => output::print_document(&job, format)?,
            }
        }

        JobCommands::Running => {
            let jobs: Vec<Job> = client.get("/job/query/status").await?;
            match format {
                OutputFormat::Table => {
                    let rows: Vec<JobRow> = jobs.iter().map(|job| JobRow::new(job, None)).collect();
                    output::print_rows(&rows, format)?;
                }
                _ => output::print_document(&jobs, format)?,
            }
        }

        JobCommands::Count => {
            let total: u64 = client.get("/job/query/totalrecord").await?;
            match format {
                OutputFormat::Table => println!("{}", total),
                _ => output::print_document(&serde_json::json!({ "totalRecord": total }), format)?,
            }
        }

        JobCommands::DataView(key) => {
            let resp = client
                .post::<_, serde_json::Value>("/job/tracking/job/data_view", &key)
                .await?;
            output::print_document(&resp.data.unwrap_or(serde_json::Value::Null), format)?;
        }

        JobCommands::Stop { key, force } => {
            if !force {
                output::notice(Notice::Info, &format!(
                    "This will stop job {} ({} {}). Use --force to confirm.",
                    key.job_id, key.role, key.party_id
                ));
                return Ok(());
            }

            let resp = client
                .post::<_, serde_json::Value>("/job/v1/pipeline/job/stop", &key)
                .await?;
            output::notice(Notice::Ok, &format!("Job {}: {}", key.job_id, resp.message));
        }
    }

    Ok(())
}
