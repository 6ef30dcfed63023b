//! StoredRow shaping and aggregate statistics over stored rows.
//!
//! Pure functions only: the wall clock is passed in, so both directions
//! (record → row, rows → stats) are testable without a spreadsheet.

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use crate::llm::{AnalysisContext, ProspectRecord};

/// Column headers, in StoredRow order. Written once when the sheet is created.
pub const HEADERS: [&str; 19] = [
    "Timestamp",
    "Name",
    "Company",
    "Job Title",
    "Location",
    "Platform",
    "URL",
    "Post Content",
    "Industry",
    "Decision Maker Score",
    "Response Likelihood",
    "Outreach Angle",
    "Personalized Message",
    "Best Timing",
    "Key Talking Points",
    "Confidence Score",
    "Analysis Model",
    "Status",
    "Notes",
];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_SCORE: i64 = 5;
pub const STATUS_NEW: &str = "New";

/// One prospect, flattened for the spreadsheet. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub timestamp: String,
    pub name: String,
    pub company: String,
    pub job_title: String,
    pub location: String,
    pub platform: String,
    pub url: String,
    pub post_content: String,
    pub industry: String,
    pub decision_maker_score: Value,
    pub response_likelihood: Value,
    pub outreach_angle: String,
    pub personalized_message: String,
    pub best_timing: String,
    pub key_talking_points: String,
    pub confidence_score: Value,
    pub analysis_model: String,
    pub status: String,
    pub notes: String,
}

impl StoredRow {
    pub fn build(
        record: &ProspectRecord,
        model_used: &str,
        context: &AnalysisContext,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            name: text(record, "person_name"),
            company: text(record, "company"),
            job_title: text(record, "job_title"),
            location: text(record, "location"),
            platform: context_text(context, "platform"),
            url: context_text(context, "url"),
            post_content: text(record, "post_content"),
            industry: text(record, "industry"),
            decision_maker_score: score(record, "decision_maker_score"),
            response_likelihood: score(record, "response_likelihood"),
            outreach_angle: text(record, "outreach_angle"),
            personalized_message: text(record, "personalized_message"),
            best_timing: text(record, "best_timing"),
            key_talking_points: joined(record, "key_talking_points"),
            confidence_score: score(record, "confidence_score"),
            analysis_model: model_used.to_string(),
            status: STATUS_NEW.to_string(),
            notes: text(record, "analysis_notes"),
        }
    }

    /// Cells in HEADERS order.
    pub fn cells(&self) -> Vec<Value> {
        let s = |v: &String| Value::String(v.clone());
        vec![
            s(&self.timestamp),
            s(&self.name),
            s(&self.company),
            s(&self.job_title),
            s(&self.location),
            s(&self.platform),
            s(&self.url),
            s(&self.post_content),
            s(&self.industry),
            self.decision_maker_score.clone(),
            self.response_likelihood.clone(),
            s(&self.outreach_angle),
            s(&self.personalized_message),
            s(&self.best_timing),
            s(&self.key_talking_points),
            self.confidence_score.clone(),
            s(&self.analysis_model),
            s(&self.status),
            s(&self.notes),
        ]
    }
}

pub fn header_cells() -> Vec<Value> {
    HEADERS.iter().map(|h| Value::String((*h).to_string())).collect()
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn context_text(context: &AnalysisContext, key: &str) -> String {
    context.field(key).map(|v| v.into_owned()).unwrap_or_default()
}

fn text(record: &ProspectRecord, key: &str) -> String {
    record.get(key).map(display).unwrap_or_default()
}

/// Scores stay numeric when they can. Absent, null or blank → 5.
fn score(record: &ProspectRecord, key: &str) -> Value {
    match record.get(key) {
        None | Some(Value::Null) => Value::from(DEFAULT_SCORE),
        Some(Value::Number(n)) => Value::Number(n.clone()),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Value::from(DEFAULT_SCORE)
            } else if let Ok(n) = trimmed.parse::<i64>() {
                Value::from(n)
            } else if let Some(n) = trimmed.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Value::Number(n)
            } else {
                Value::String(s.clone())
            }
        }
        Some(other) => Value::String(other.to_string()),
    }
}

fn joined(record: &ProspectRecord, key: &str) -> String {
    match record.get(key) {
        Some(Value::Array(items)) => items.iter().map(display).collect::<Vec<_>>().join(", "),
        Some(other) => display(other),
        None => String::new(),
    }
}

// ── Stats ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProspectStats {
    pub total_prospects: usize,
    pub today_prospects: usize,
    pub avg_decision_score: f64,
    pub avg_response_likelihood: f64,
    pub last_updated: String,
}

/// Aggregate all stored rows. `rows[0]` is the header row; every later row
/// is a record keyed by that header.
pub fn compute_stats(rows: &[Vec<Value>], today: &str, last_updated: String) -> ProspectStats {
    let Some((header, records)) = rows.split_first() else {
        return ProspectStats {
            total_prospects: 0,
            today_prospects: 0,
            avg_decision_score: 0.0,
            avg_response_likelihood: 0.0,
            last_updated,
        };
    };

    let column = |name: &str| header.iter().position(|cell| cell.as_str() == Some(name));
    let ts_col = column("Timestamp");
    let dm_col = column("Decision Maker Score");
    let rl_col = column("Response Likelihood");

    let total = records.len();
    let today_count = records
        .iter()
        .filter(|row| {
            cell(row, ts_col)
                .and_then(Value::as_str)
                .is_some_and(|ts| ts.starts_with(today))
        })
        .count();
    let sum = |col: Option<usize>| -> f64 { records.iter().map(|row| numeric(cell(row, col))).sum() };
    let divisor = total.max(1) as f64;

    ProspectStats {
        total_prospects: total,
        today_prospects: today_count,
        avg_decision_score: round1(sum(dm_col) / divisor),
        avg_response_likelihood: round1(sum(rl_col) / divisor),
        last_updated,
    }
}

fn cell(row: &[Value], col: Option<usize>) -> Option<&Value> {
    col.and_then(|c| row.get(c))
}

fn numeric(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
