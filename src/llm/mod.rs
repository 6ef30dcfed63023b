//! LLM domain — prompt, vision model client, and response parsing.
//!
//! External code should only use the items exported here.
//!
//!   - prompts.rs — analysis prompt + model constants
//!   - gemini.rs  — Google Gemini vision client
//!   - parse.rs   — free text → ProspectRecord (with fallback)
//!   - types.rs   — AnalysisContext + ProspectRecord schema

mod gemini;
pub mod parse;
pub mod prompts;
pub mod types;

pub use gemini::{extract_candidate_text, GeminiVision, GEMINI_BASE_URL};
pub use parse::parse_model_response;
pub use prompts::{build_analysis_prompt, MODEL_LABEL};
pub use types::{AnalysisContext, ProspectRecord, REQUIRED_FIELDS};

use crate::error::AnalysisError;
use async_trait::async_trait;

/// A decoded screenshot ready to attach to a model request.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Multimodal generation API: prompt + image in, free text out.
///
/// Built once at startup and shared by every request.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Identifier reported in analysis envelopes and stored rows.
    fn model_id(&self) -> &str;

    async fn generate(&self, prompt: &str, image: &InlineImage) -> Result<String, AnalysisError>;
}
