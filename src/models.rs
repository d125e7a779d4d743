// src/models.rs
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STYLE: &str = "modern";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleEntry {
    pub id: &'static str,
    pub prompt_fragment: &'static str,
}

/// One uploaded photo plus the requested style, as parsed from the form.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub image: Option<Bytes>,
    pub content_type: Option<String>,
    pub style_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime_type: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub negative_prompt: Option<String>,
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutput {
    Url(String),
    InlineImage { data: Vec<u8>, mime_type: String },
}

impl ProviderOutput {
    pub fn into_display_ref(self) -> String {
        match self {
            ProviderOutput::Url(url) => url,
            ProviderOutput::InlineImage { data, mime_type } => data_uri(&mime_type, &data),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedesignResult {
    #[serde(rename = "url")]
    pub display_ref: String,
    #[serde(rename = "style")]
    pub style_id: String,
}

pub fn data_uri(mime_type: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(data)
    )
}
