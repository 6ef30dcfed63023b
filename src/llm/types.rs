//! Analysis types — request context and the ProspectRecord schema.
//!
//! The model returns loosely-shaped JSON, so ProspectRecord wraps a JSON
//! object instead of a fixed struct. A small set of keys is required (always
//! present after parsing), the rest of the schema is optional, and any
//! extra key the model invents passes through untouched.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys guaranteed to be present in every parsed record.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "person_name",
    "job_title",
    "company",
    "decision_maker_score",
    "response_likelihood",
    "outreach_angle",
    "personalized_message",
];

/// Full key set the prompt asks the model for, in prompt order.
pub const SCHEMA_FIELDS: [(&str, &str); 17] = [
    ("person_name", "\"string\""),
    ("job_title", "\"string\""),
    ("company", "\"string\""),
    ("location", "\"string\""),
    ("post_content", "\"string\""),
    ("post_topic", "\"string\""),
    ("decision_maker_score", "number"),
    ("company_size_estimate", "\"string\""),
    ("industry", "\"string\""),
    ("response_likelihood", "number"),
    ("outreach_angle", "\"string\""),
    ("personalization_opportunities", "[\"string\"]"),
    ("best_timing", "\"string\""),
    ("key_talking_points", "[\"string\"]"),
    ("personalized_message", "\"string\""),
    ("confidence_score", "number"),
    ("analysis_notes", "\"string\""),
];

/// Placeholder used for identity fields when extraction fails.
pub const NOT_EXTRACTED: &str = "Could not extract";

/// How much of the raw model output the fallback record keeps.
pub const FALLBACK_NOTES_CHARS: usize = 500;

/// Page metadata sent by the browser extension alongside the screenshot.
///
/// Values are whatever JSON the extension sent (`timestamp` is often a
/// `Date.now()` number). Platform-specific extras (profile_name,
/// tweet_content, ...) are kept in `extra` so they survive a round trip
/// through the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisContext {
    /// Field `key` as text: strings verbatim, other values as JSON text.
    /// None when absent or null.
    pub fn field(&self, key: &str) -> Option<Cow<'_, str>> {
        let value = match key {
            "platform" => self.platform.as_ref(),
            "page_type" => self.page_type.as_ref(),
            "url" => self.url.as_ref(),
            "timestamp" => self.timestamp.as_ref(),
            other => self.extra.get(other),
        };
        match value? {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

/// Structured prospect data derived from one model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProspectRecord(Map<String, Value>);

impl ProspectRecord {
    /// Wrap a decoded JSON object, filling every absent required key with "".
    pub fn from_object(mut fields: Map<String, Value>) -> Self {
        for key in REQUIRED_FIELDS {
            fields
                .entry(key)
                .or_insert_with(|| Value::String(String::new()));
        }
        Self(fields)
    }

    /// Fixed-shape record used when the model output holds no usable JSON.
    pub fn fallback(raw_response: &str) -> Self {
        let excerpt: String = raw_response.chars().take(FALLBACK_NOTES_CHARS).collect();
        let text = |v: &str| Value::String(v.to_string());
        let fields: Map<String, Value> = [
            ("person_name", text(NOT_EXTRACTED)),
            ("job_title", text(NOT_EXTRACTED)),
            ("company", text(NOT_EXTRACTED)),
            ("location", text("")),
            ("post_content", text("")),
            ("post_topic", text("")),
            ("decision_maker_score", Value::from(5)),
            ("company_size_estimate", text("Unknown")),
            ("industry", text("Unknown")),
            ("response_likelihood", Value::from(5)),
            ("outreach_angle", text("General professional outreach")),
            ("personalization_opportunities", Value::Array(Vec::new())),
            ("best_timing", text("Business hours")),
            ("key_talking_points", Value::Array(Vec::new())),
            (
                "personalized_message",
                text("Hi, I saw your profile and would love to connect about potential opportunities."),
            ),
            ("confidence_score", Value::from(3)),
            ("analysis_notes", Value::String(format!("Raw AI response: {}...", excerpt))),
            ("parsing_failed", Value::Bool(true)),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`, or None when absent or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// True only for the fallback record.
    pub fn parsing_failed(&self) -> bool {
        self.0
            .get("parsing_failed")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}
