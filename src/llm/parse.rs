//! Model response parsing — free text → ProspectRecord.
//!
//! Gemini is asked for JSON but frequently wraps it in prose or markdown
//! fences. We take everything from the first `{` to the last `}` and try to
//! decode that. Anything that does not yield a JSON object becomes the
//! fallback record, so this function always returns something storable.
//!
//! The match is greedy across the whole response: trailing text containing a
//! stray `}` after the real object makes the slice undecodable, and the
//! caller gets the fallback record.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::types::ProspectRecord;

fn json_block() -> &'static Regex {
    static JSON_BLOCK: OnceLock<Regex> = OnceLock::new();
    JSON_BLOCK.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

/// Return the first-`{`-to-last-`}` slice of `text`, if any.
pub fn extract_json_block(text: &str) -> Option<&str> {
    json_block().find(text).map(|m| m.as_str())
}

/// Parse the model's text into a ProspectRecord. Never fails.
pub fn parse_model_response(text: &str) -> ProspectRecord {
    let Some(block) = extract_json_block(text) else {
        log::warn!("[LLM] No JSON object in response — using fallback record");
        return ProspectRecord::fallback(text);
    };

    match serde_json::from_str::<Map<String, Value>>(block) {
        Ok(fields) => {
            log::info!("[LLM] Parse result: success ({} keys)", fields.len());
            ProspectRecord::from_object(fields)
        }
        Err(e) => {
            log::warn!("[LLM] JSON parsing failed: {} — using fallback record", e);
            ProspectRecord::fallback(text)
        }
    }
}
