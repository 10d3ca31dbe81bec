//! Clinical event log for a resuscitation session.
//!
//! Entries are kept newest first, the way the resuscitation screen shows
//! them. Exports (text report, CSV) are chronological.

use crate::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::Path;

/// Kind of logged event
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Medication,
    Shock,
    Info,
}

impl EventCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Medication => "medication",
            EventCategory::Shock => "shock",
            EventCategory::Info => "info",
        }
    }
}

/// One timestamped clinical action
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub category: EventCategory,
}

impl LogEntry {
    /// Wall-clock time as `HH:MM:SS`
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// Append-only log, newest entry first
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.insert(0, entry);
    }

    /// Entries with the most recent first
    pub fn newest_first(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries in the order they happened
    pub fn chronological(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Totals printed at the top of a report
#[derive(Clone, Debug)]
pub struct ReportSummary {
    pub generated_at: DateTime<Local>,
    pub elapsed: String,
    pub rounds: u32,
    pub shocks: u32,
    pub adrenaline_mg: f64,
}

/// Milligrams to at most two decimals, without trailing zeros
pub fn format_mg(mg: f64) -> String {
    let text = format!("{:.2}", mg);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Plain-text report: header, blank line, one `[time] message` per event
pub fn render_report(summary: &ReportSummary, log: &EventLog) -> String {
    let mut lines = vec![
        format!(
            "Resuscitation report - {}",
            summary.generated_at.format("%Y-%m-%d")
        ),
        format!("Duration: {}", summary.elapsed),
        format!("Rounds: {}", summary.rounds),
        format!("Shocks: {}", summary.shocks),
        format!("Adrenaline: {} mg", format_mg(summary.adrenaline_mg)),
        String::new(),
    ];

    if log.is_empty() {
        lines.push("(no events)".to_string());
    }
    lines.extend(
        log.chronological()
            .map(|entry| format!("[{}] {}", entry.time_label(), entry.message)),
    );

    lines.join("\n")
}

/// A row in the CSV export
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    timestamp: String,
    category: &'static str,
    message: &'a str,
}

impl<'a> From<&'a LogEntry> for CsvRow<'a> {
    fn from(entry: &'a LogEntry) -> Self {
        CsvRow {
            timestamp: entry.timestamp.to_rfc3339(),
            category: entry.category.as_str(),
            message: &entry.message,
        }
    }
}

/// Write the log chronologically as CSV, replacing any existing file.
///
/// Returns the number of rows written.
pub fn write_csv(log: &EventLog, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    for entry in log.chronological() {
        writer.serialize(CsvRow::from(entry))?;
    }

    writer.flush()?;
    tracing::info!("Exported {} events to {:?}", log.len(), path);
    Ok(log.len())
}
