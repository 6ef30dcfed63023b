//! Screenshot analysis pipeline.
//!
//! strip data-URI header → base64 decode → image decode → prompt →
//! vision model → parse → envelope.
//!
//! `AnalysisService::analyze_screenshot` never returns an error: every
//! failure along the way is folded into a `{success: false, error}`
//! envelope so the HTTP layer only has to pick a status code.

use std::io::Cursor;
use std::sync::Arc;

use base64::Engine;
use image::ImageFormat;
use serde::Serialize;

use crate::error::AnalysisError;
use crate::llm::{self, AnalysisContext, InlineImage, ProspectRecord, VisionModel};

/// Result of one analysis, serialized verbatim into API responses.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ProspectRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub model_used: String,
    /// Model text exactly as received, kept for auditing the parser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl AnalysisOutcome {
    fn success(model_used: &str, analysis: ProspectRecord, raw_response: String) -> Self {
        Self {
            success: true,
            analysis: Some(analysis),
            error: None,
            model_used: model_used.to_string(),
            raw_response: Some(raw_response),
        }
    }

    fn failure(model_used: &str, error: &AnalysisError) -> Self {
        Self {
            success: false,
            analysis: None,
            error: Some(error.to_string()),
            model_used: model_used.to_string(),
            raw_response: None,
        }
    }
}

pub struct AnalysisService {
    model: Arc<dyn VisionModel>,
}

impl AnalysisService {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Run the full pipeline for one screenshot.
    pub async fn analyze_screenshot(
        &self,
        image_data: &str,
        context: &AnalysisContext,
    ) -> AnalysisOutcome {
        let start = std::time::Instant::now();
        match self.run(image_data, context).await {
            Ok((analysis, raw)) => {
                log::info!(
                    "[ANALYZE] Complete in {}ms (parse: {})",
                    start.elapsed().as_millis(),
                    if analysis.parsing_failed() { "fallback" } else { "success" }
                );
                AnalysisOutcome::success(self.model_id(), analysis, raw)
            }
            Err(e) => {
                log::error!("[ANALYZE] Gemini analysis error: {}", e);
                AnalysisOutcome::failure(self.model_id(), &e)
            }
        }
    }

    async fn run(
        &self,
        image_data: &str,
        context: &AnalysisContext,
    ) -> Result<(ProspectRecord, String), AnalysisError> {
        let image = decode_screenshot(image_data)?;
        let prompt = llm::build_analysis_prompt(context);
        let raw = self.model.generate(&prompt, &image).await?;
        Ok((llm::parse_model_response(&raw), raw))
    }
}

/// Drop a `data:image/...;base64,` header if present.
pub fn strip_data_uri(data: &str) -> Result<&str, AnalysisError> {
    let data = data.trim();
    if !data.starts_with("data:image") {
        return Ok(data);
    }
    data.split_once(',')
        .map(|(_, payload)| payload)
        .ok_or(AnalysisError::DataUri)
}

/// Decode a base64 (or data-URI) screenshot into bytes the model accepts.
///
/// PNG, JPEG and WEBP are sent untouched. Any other format the image crate
/// can read is re-encoded to PNG.
pub fn decode_screenshot(data: &str) -> Result<InlineImage, AnalysisError> {
    let payload: String = strip_data_uri(data)?
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;

    let format = image::guess_format(&bytes)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    let (width, height) = (decoded.width(), decoded.height());

    let (mime_type, bytes) = match format {
        ImageFormat::Png => ("image/png", bytes),
        ImageFormat::Jpeg => ("image/jpeg", bytes),
        ImageFormat::WebP => ("image/webp", bytes),
        other => {
            log::info!("[ANALYZE] Re-encoding {:?} screenshot as PNG", other);
            let mut png_bytes = Vec::new();
            decoded.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;
            ("image/png", png_bytes)
        }
    };

    Ok(InlineImage {
        mime_type,
        bytes,
        width,
        height,
    })
}
