//! Health check command.
//!
//! Queries the `/health` endpoint and displays server and worker pool status.

use anyhow::Result;
use clap::Args;

use crate::client::ApiClient;
use crate::output::{self, Notice, OutputFormat, Section};

#[derive(Args)]
pub struct HealthArgs {
    /// Include worker pool statistics
    #[arg(short, long)]
    detailed: bool,
}

fn field(value: &serde_json::Value, key: &str) -> String {
    match value.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

const POOL_FIELDS: [&str; 11] = [
    "name",
    "queued",
    "queueCapacity",
    "tasksSubmitted",
    "tasksSucceeded",
    "tasksFailed",
    "tasksRejected",
    "acquireTimeouts",
    "peakConcurrent",
    "avgWaitTimeUs",
    "avgExecTimeUs",
];

fn summary_section(health: &serde_json::Value, api_url: &str) -> Section {
    let busy = health
        .get("workerPool")
        .map(|pool| format!("{}/{}", field(pool, "activeWorkers"), field(pool, "maxWorkers")));
    Section::new("Server Health")
        .field("Status", field(health, "status"))
        .field("API URL", api_url)
        .field("Version", field(health, "version"))
        .field("Timestamp", field(health, "timestamp"))
        .field_if("Workers busy", busy)
}

fn pool_section(pool: &serde_json::Value) -> Section {
    POOL_FIELDS
        .iter()
        .fold(Section::new("Worker Pool"), |section, key| section.field(*key, field(pool, key)))
}

pub async fn execute(args: HealthArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: serde_json::Value = client.get_raw("/health").await?;

    match format {
        OutputFormat::Table => {
            let status = health
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");

            summary_section(&health, client.base_url()).print();

            if args.detailed {
                if let Some(pool) = health.get("workerPool") {
                    pool_section(pool).print();
                }
            }

            if status == "healthy" {
                output::notice(Notice::Ok, "Server operational");
            } else {
                output::notice(Notice::Error, &format!("Server status: {}", status));
            }
        }
        _ => output::print_document(&health, format)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_shows_pool_occupancy() {
        colored::control::set_override(false);
        let health = json!({
            "status": "healthy",
            "version": "0.1.0",
            "workerPool": {"activeWorkers": 3, "maxWorkers": 16}
        });
        let text = summary_section(&health, "http://board:8080").render();
        assert!(text.contains("Workers busy  3/16"));
        assert!(text.contains("Timestamp     -"));
    }

    #[test]
    fn test_summary_without_pool() {
        colored::control::set_override(false);
        let text = summary_section(&json!({"status": "degraded"}), "http://board").render();
        assert!(!text.contains("Workers busy"));
        assert!(text.contains("degraded"));
    }

    #[test]
    fn test_pool_section_lists_every_counter() {
        colored::control::set_override(false);
        let text = pool_section(&json!({"tasksRejected": 0})).render();
        assert_eq!(text.lines().count(), 1 + POOL_FIELDS.len());
        assert!(text.contains("tasksRejected    0"));
    }
}
