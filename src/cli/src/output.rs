//! Terminal rendering for jobboard commands.
//!
//! Rendering returns strings so commands and tests share one code path;
//! the `print_*` wrappers only add the final write.

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

/// Output format selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables and sections
    #[default]
    Table,
    /// The server's JSON, pretty-printed
    Json,
    /// The server's JSON, as YAML
    Yaml,
}

/// One-line status message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Ok,
    Info,
    Error,
}

impl Notice {
    fn tag(self) -> ColoredString {
        match self {
            Self::Ok => "ok".green().bold(),
            Self::Info => "note".blue().bold(),
            Self::Error => "error".red().bold(),
        }
    }
}

pub fn notice_line(kind: Notice, msg: &str) -> String {
    format!("{}: {}", kind.tag(), msg)
}

/// Errors go to stderr, everything else to stdout.
pub fn notice(kind: Notice, msg: &str) {
    match kind {
        Notice::Error => eprintln!("{}", notice_line(kind, msg)),
        _ => println!("{}", notice_line(kind, msg)),
    }
}

/// Serialize a response body for the JSON and YAML formats.
///
/// `Table` falls back to JSON for values that have no tabular shape.
pub fn render_document<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Table | OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?.trim_end().to_string(),
    })
}

pub fn print_document<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<()> {
    println!("{}", render_document(value, format)?);
    Ok(())
}

/// Job rows as a table, with the id column pinned left.
pub fn render_table<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return "No jobs.".dimmed().to_string();
    }
    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::left()))
        .to_string()
}

pub fn print_rows<T: Tabled + Serialize>(rows: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_table(rows)),
        _ => print_document(rows, format)?,
    }
    Ok(())
}

/// A titled block of aligned `label: value` lines.
#[derive(Debug, Default)]
pub struct Section {
    title: String,
    fields: Vec<(String, String)>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((label.into(), value.into()));
        self
    }

    pub fn field_if(self, label: impl Into<String>, value: Option<String>) -> Self {
        match value {
            Some(value) => self.field(label, value),
            None => self,
        }
    }

    pub fn render(&self) -> String {
        let width = self.fields.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        let mut out = format!("{}\n", self.title.bold().underline());
        for (label, value) in &self.fields {
            let padded = format!("{:<width$}", label, width = width);
            out.push_str(&format!("  {}  {}\n", padded.cyan(), value));
        }
        out
    }

    pub fn print(&self) {
        println!("{}", self.render());
    }
}

/// Epoch milliseconds as a local timestamp, or `-`.
pub fn format_millis(millis: Option<i64>) -> String {
    millis
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// A job's `f_elapsed` (milliseconds) as `1h 02m 03s`, `2m 05s` or `7s`.
pub fn format_elapsed(millis: i64) -> String {
    let secs = millis.max(0) / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Color a job status for table output.
pub fn colored_status(status: &str) -> String {
    match status {
        "success" | "complete" => status.green().to_string(),
        "running" => status.cyan().to_string(),
        "waiting" => status.yellow().to_string(),
        "failed" | "timeout" => status.red().to_string(),
        "canceled" => status.dimmed().to_string(),
        other => other.to_string(),
    }
}
