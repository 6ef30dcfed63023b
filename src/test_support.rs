//! Shared fixtures for unit tests: a scripted vision model and image helpers.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::AnalysisError;
use crate::llm::{InlineImage, VisionModel};

enum Reply {
    Text(String),
    Status(u16, String),
}

/// VisionModel that returns a canned reply and records what it was sent.
pub struct ScriptedModel {
    reply: Reply,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self::with(Reply::Text(text.to_string())))
    }

    pub fn failing(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self::with(Reply::Status(status, body.to_string())))
    }

    fn with(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted_model"
    }

    async fn generate(&self, prompt: &str, _image: &InlineImage) -> Result<String, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Status(status, body) => Err(AnalysisError::Status {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

/// Base64 of a solid image in the given container format.
pub fn encode_image(width: u32, height: u32, format: ImageFormat) -> String {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([30, 90, 200])));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn png_base64(width: u32, height: u32) -> String {
    encode_image(width, height, ImageFormat::Png)
}
