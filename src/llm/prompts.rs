//! Prospect analysis prompt.
//!
//! This prompt is the contract between the backend and the vision model:
//! the key list at the bottom must stay in sync with `types::SCHEMA_FIELDS`,
//! which it is generated from.

use std::borrow::Cow;

use super::types::{AnalysisContext, SCHEMA_FIELDS};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Identifier reported to callers and written to the "Analysis Model" column.
pub const MODEL_LABEL: &str = "google_gemini_vision";

const OBJECTIVES: &str = r#"1. PERSON IDENTIFICATION:
   - Full name
   - Current job title/role
   - Company name
   - Location (if visible)

2. CONTENT ANALYSIS:
   - Recent post content (if visible)
   - Post topic/theme
   - Engagement level indicators
   - Professional interests shown

3. PROSPECT EVALUATION:
   - Decision maker potential (1-10 score)
   - Company size indicators
   - Industry relevance
   - Likelihood to respond to outreach

4. OUTREACH STRATEGY:
   - Best approach angle
   - Personalization opportunities
   - Timing recommendations
   - Key talking points

5. PERSONALIZED MESSAGE:
   - Draft a personalized outreach message (under 150 words)
   - Reference specific content they posted
   - Include clear value proposition
   - Professional but warm tone"#;

/// Build the analysis prompt for one screenshot.
///
/// Context values are embedded verbatim (non-strings as JSON text); absent or
/// null platform/page type render as "unknown", URL/timestamp as "N/A".
pub fn build_analysis_prompt(context: &AnalysisContext) -> String {
    let or = |key: &str, default: &'static str| {
        context.field(key).unwrap_or(Cow::Borrowed(default))
    };
    let platform = or("platform", "unknown");
    let page_type = or("page_type", "unknown");
    let url = or("url", "N/A");
    let timestamp = or("timestamp", "N/A");

    format!(
        r#"Analyze this {platform} screenshot for prospect research and lead generation.

Context Information:
- Platform: {platform}
- Page Type: {page_type}
- URL: {url}
- Timestamp: {timestamp}

Please extract and analyze the following information:

{objectives}

Return your analysis as a JSON object with these exact keys:
{schema}

Be thorough but concise. Focus on actionable insights for B2B outreach."#,
        objectives = OBJECTIVES,
        schema = schema_block()
    )
}

fn schema_block() -> String {
    let lines: Vec<String> = SCHEMA_FIELDS
        .iter()
        .map(|(key, ty)| format!("    \"{key}\": {ty}"))
        .collect();
    format!("{{\n{}\n}}", lines.join(",\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linkedin() -> AnalysisContext {
        AnalysisContext {
            platform: Some("linkedin".into()),
            page_type: Some("profile".into()),
            url: Some("https://www.linkedin.com/in/jane".into()),
            timestamp: Some("2026-10-18T09:30:00Z".into()),
            ..Default::default()
        }
    }

    #[test]
    fn context_fields_are_inlined() {
        let prompt = build_analysis_prompt(&linkedin());
        assert!(prompt.starts_with("Analyze this linkedin screenshot"));
        assert!(prompt.contains("- Page Type: profile"));
        assert!(prompt.contains("- URL: https://www.linkedin.com/in/jane"));
        assert!(prompt.contains("- Timestamp: 2026-10-18T09:30:00Z"));
    }

    #[test]
    fn missing_context_uses_placeholders() {
        let prompt = build_analysis_prompt(&AnalysisContext::default());
        assert!(prompt.contains("- Platform: unknown"));
        assert!(prompt.contains("- Page Type: unknown"));
        assert!(prompt.contains("- URL: N/A"));
        assert!(prompt.contains("- Timestamp: N/A"));
    }

    #[test]
    fn lists_all_five_objectives_and_every_key() {
        let prompt = build_analysis_prompt(&linkedin());
        for heading in [
            "1. PERSON IDENTIFICATION",
            "2. CONTENT ANALYSIS",
            "3. PROSPECT EVALUATION",
            "4. OUTREACH STRATEGY",
            "5. PERSONALIZED MESSAGE",
        ] {
            assert!(prompt.contains(heading), "missing {heading}");
        }
        for (key, ty) in SCHEMA_FIELDS {
            assert!(prompt.contains(&format!("\"{key}\": {ty}")), "missing {key}");
        }
    }

    #[test]
    fn values_are_not_sanitized() {
        let ctx = AnalysisContext {
            url: Some("javascript:{alert(1)}".into()),
            ..Default::default()
        };
        assert!(build_analysis_prompt(&ctx).contains("- URL: javascript:{alert(1)}"));
    }

    #[test]
    fn non_string_values_render_as_json() {
        let ctx = AnalysisContext {
            platform: Some(serde_json::Value::Null),
            timestamp: Some(1697040000000u64.into()),
            url: Some(serde_json::json!(["a", 1])),
            ..Default::default()
        };
        let prompt = build_analysis_prompt(&ctx);
        assert!(prompt.contains("- Platform: unknown"));
        assert!(prompt.contains("- Timestamp: 1697040000000"));
        assert!(prompt.contains(r#"- URL: ["a",1]"#));
    }
}
