// src/test_support.rs
// Shared fixtures for unit and endpoint tests.
use crate::errors::RedesignError;
use crate::models::{GenerationParams, ProviderOutput};
use crate::services::providers::{ImageInput, ProviderAdapter};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

pub fn png_rgba_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 90, ((x + y) * 3 % 256) as u8])
    });
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), format).unwrap();
    out
}

pub struct MultipartField<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

pub const BOUNDARY: &str = "restyle-test-boundary";

pub fn multipart_body(fields: &[MultipartField<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for field in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match field.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    field.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", field.name).as_bytes(),
            ),
        }
        if let Some(content_type) = field.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(field.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

#[derive(Debug, Clone)]
struct SeenCall {
    data: Vec<u8>,
    mime_type: String,
    prompt: String,
    scratch_path: Option<PathBuf>,
    scratch_existed: bool,
}

/// Provider double that replays scripted outcomes and records every call.
pub struct StubProvider {
    outcomes: Mutex<VecDeque<Result<ProviderOutput, RedesignError>>>,
    fallback: ProviderOutput,
    config_error: Option<String>,
    wants_scratch: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<SeenCall>>,
}

impl StubProvider {
    pub fn returning_url(url: &str) -> Self {
        Self::with_fallback(Vec::new(), ProviderOutput::Url(url.to_string()))
    }

    pub fn scripted(outcomes: Vec<Result<ProviderOutput, RedesignError>>) -> Self {
        Self::with_fallback(outcomes, ProviderOutput::Url("https://stub.invalid/unused".into()))
    }

    fn with_fallback(
        outcomes: Vec<Result<ProviderOutput, RedesignError>>,
        fallback: ProviderOutput,
    ) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            fallback,
            config_error: None,
            wants_scratch: false,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_config_error(mut self, message: &str) -> Self {
        self.config_error = Some(message.to_string());
        self
    }

    pub fn with_scratch_file(mut self) -> Self {
        self.wants_scratch = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|c| c.prompt.clone()).collect()
    }

    pub fn images(&self) -> Vec<(Vec<u8>, String)> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|c| (c.data.clone(), c.mime_type.clone()))
            .collect()
    }

    pub fn scratch_paths(&self) -> Vec<PathBuf> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| c.scratch_path.clone())
            .collect()
    }

    pub fn scratch_existed_during_calls(&self) -> bool {
        self.seen.lock().unwrap().iter().all(|c| c.scratch_existed)
    }
}

#[async_trait]
impl ProviderAdapter for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    fn default_params(&self) -> GenerationParams {
        GenerationParams {
            guidance_scale: 1.0,
            num_inference_steps: 1,
            negative_prompt: None,
            seed: Some(42),
        }
    }

    fn check_configuration(&self) -> Result<(), RedesignError> {
        match &self.config_error {
            Some(message) => Err(RedesignError::Configuration(message.clone())),
            None => Ok(()),
        }
    }

    fn needs_scratch_file(&self) -> bool {
        self.wants_scratch
    }

    async fn generate(
        &self,
        image: ImageInput<'_>,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderOutput, RedesignError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(SeenCall {
            data: image.data.to_vec(),
            mime_type: image.mime_type.to_string(),
            prompt: prompt.to_string(),
            scratch_path: image.scratch_path.map(|p| p.to_path_buf()),
            scratch_existed: image.scratch_path.map(|p| p.exists()).unwrap_or(true),
        });

        let next = self.outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}
