//! Gemini vision client — one-shot `generateContent` via the Google AI API.
//!
//! Differences from a text-only call:
//! - the screenshot travels as an `inline_data` part next to the prompt
//! - no `responseMimeType` enforcement: the prompt asks for JSON and the
//!   parser copes with whatever prose surrounds it
//! - API key in URL query param, not header
//!
//! No retries and no timeout beyond reqwest's defaults; a failed call is
//! surfaced to the pipeline immediately.

use async_trait::async_trait;
use base64::Engine;

use super::prompts::{DEFAULT_MODEL, MODEL_LABEL};
use super::{InlineImage, VisionModel};
use crate::error::{truncate_body, AnalysisError};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiVision {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiVision {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Build from an optional key; None when the key is missing or empty.
    pub fn from_key(api_key: Option<&str>, model: Option<&str>) -> Option<Self> {
        match api_key {
            Some(key) if !key.trim().is_empty() => {
                Some(Self::new(key.trim(), model.unwrap_or(DEFAULT_MODEL)))
            }
            _ => None,
        }
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl VisionModel for GeminiVision {
    fn model_id(&self) -> &str {
        MODEL_LABEL
    }

    async fn generate(&self, prompt: &str, image: &InlineImage) -> Result<String, AnalysisError> {
        log::info!("[LLM] Provider: gemini");
        log::info!("[LLM] Model: {}", self.model);
        log::info!(
            "[LLM] Image: {} ({}x{}, {} bytes)",
            image.mime_type,
            image.width,
            image.height,
            image.bytes.len()
        );

        let start = std::time::Instant::now();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "contents": [
                    {
                        "role": "user",
                        "parts": [
                            { "text": prompt },
                            {
                                "inline_data": {
                                    "mime_type": image.mime_type,
                                    "data": encoded
                                }
                            }
                        ]
                    }
                ]
            }))
            .send()
            .await
            .map_err(|e| {
                // reqwest errors carry the URL, which carries the key.
                let e = e.without_url();
                log::error!("[LLM] HTTP request failed: {}", e);
                AnalysisError::Http(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AnalysisError::Http(e.without_url()))?;
        log::info!("[LLM] API latency: {}ms", start.elapsed().as_millis());

        if !status.is_success() {
            log::error!("[LLM] Gemini API returned {}: {}", status, truncate_body(&body, 200));
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: truncate_body(&body, 500),
            });
        }

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| AnalysisError::EmptyResponse(format!("response is not JSON: {}", e)))?;

        if let Some(usage) = json.get("usageMetadata") {
            log::info!(
                "[LLM] Input tokens: {}, output tokens: {}",
                usage["promptTokenCount"].as_u64().unwrap_or(0),
                usage["candidatesTokenCount"].as_u64().unwrap_or(0)
            );
        }

        extract_candidate_text(&json).ok_or_else(|| {
            let reason = json["promptFeedback"]["blockReason"]
                .as_str()
                .map(|r| format!("prompt blocked ({})", r))
                .or_else(|| {
                    json["candidates"][0]["finishReason"]
                        .as_str()
                        .map(|r| format!("finish reason {}", r))
                })
                .unwrap_or_else(|| "no candidates".to_string());
            log::warn!("[LLM] Empty Gemini response: {}", reason);
            AnalysisError::EmptyResponse(reason)
        })
    }
}

/// Concatenate the text parts of the first candidate.
///
/// Gemini format: candidates[0].content.parts[*].text
pub fn extract_candidate_text(json: &serde_json::Value) -> Option<String> {
    let parts = json
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_all_text_parts_of_first_candidate() {
        let body = json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"person_name\":"}, {"text": " \"Jo\"}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        });
        assert_eq!(
            extract_candidate_text(&body).as_deref(),
            Some("{\"person_name\": \"Jo\"}")
        );
    }

    #[test]
    fn blocked_prompt_has_no_text() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        assert!(extract_candidate_text(&body).is_none());
    }

    #[test]
    fn from_key_rejects_blank_keys() {
        assert!(GeminiVision::from_key(None, None).is_none());
        assert!(GeminiVision::from_key(Some("   "), None).is_none());
        let client = GeminiVision::from_key(Some("abc"), None).unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.model_id(), MODEL_LABEL);
    }

    #[test]
    fn endpoint_uses_model_and_trimmed_base() {
        let client = GeminiVision::new("k", "gemini-test").with_base_url("http://localhost:9/v1/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1/models/gemini-test:generateContent"
        );
    }
}
