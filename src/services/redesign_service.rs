// src/services/redesign_service.rs
use crate::errors::RedesignError;
use crate::models::{DEFAULT_STYLE, RedesignResult, UploadRequest};
use crate::services::providers::{ImageInput, ProviderAdapter};
use crate::services::{ImageProcessor, RetryPolicy, ScratchFile, StyleCatalog};
use bytes::Bytes;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Per-deployment pipeline switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Longest side allowed before the image goes to the provider. `None`
    /// forwards the upload untouched.
    pub max_dimension: Option<u32>,
    pub retry: Option<RetryPolicy>,
}

pub struct RedesignService {
    catalog: Arc<StyleCatalog>,
    provider: Arc<dyn ProviderAdapter>,
    image_processor: ImageProcessor,
    options: PipelineOptions,
}

impl RedesignService {
    pub fn new(
        catalog: Arc<StyleCatalog>,
        provider: Arc<dyn ProviderAdapter>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            catalog,
            provider,
            image_processor: ImageProcessor::new(),
            options,
        }
    }

    pub async fn redesign(&self, request: UploadRequest) -> Result<RedesignResult, RedesignError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let result = self.run(request_id, request).await;
        match &result {
            Ok(result) => info!(
                "[{}] Redesign in style '{}' finished in {}ms",
                request_id,
                result.style_id,
                started.elapsed().as_millis()
            ),
            Err(err) if err.is_input_error() => info!("[{}] Rejected: {}", request_id, err),
            Err(err) => warn!("[{}] Redesign failed: {}", request_id, err),
        }
        result
    }

    async fn run(
        &self,
        request_id: Uuid,
        request: UploadRequest,
    ) -> Result<RedesignResult, RedesignError> {
        let image = request
            .image
            .filter(|data| !data.is_empty())
            .ok_or(RedesignError::MissingImage)?;

        let style_id = request.style_id.unwrap_or_else(|| DEFAULT_STYLE.to_string());
        let prompt = self.catalog.resolve(&style_id)?;

        self.provider.check_configuration()?;

        info!(
            "[{}] Redesigning {} byte upload as '{}' via {}",
            request_id,
            image.len(),
            style_id,
            self.provider.name()
        );

        let (data, mime_type) = self.prepare_image(image, request.content_type).await?;

        let scratch = if self.provider.needs_scratch_file() {
            Some(ScratchFile::create(&data, &mime_type)?)
        } else {
            None
        };

        let params = self.provider.default_params();
        let input = ImageInput {
            data: &data,
            mime_type: &mime_type,
            scratch_path: scratch.as_ref().map(|file| file.path()),
        };

        let provider = self.provider.as_ref();
        let params = &params;
        let output = match self.options.retry {
            Some(policy) => {
                policy
                    .run(move |attempt| {
                        debug!("[{}] Provider attempt {}", request_id, attempt);
                        provider.generate(input, prompt, params)
                    })
                    .await?
            }
            None => provider.generate(input, prompt, params).await?,
        };

        Ok(RedesignResult {
            display_ref: output.into_display_ref(),
            style_id,
        })
    }

    async fn prepare_image(
        &self,
        image: Bytes,
        content_type: Option<String>,
    ) -> Result<(Bytes, String), RedesignError> {
        let Some(max_dimension) = self.options.max_dimension else {
            let mime_type = self
                .image_processor
                .sniff_mime(&image)
                .map(str::to_string)
                .or(content_type.filter(|ct| ct.starts_with("image/")))
                .unwrap_or_else(|| "image/jpeg".to_string());
            return Ok((image, mime_type));
        };

        let processor = self.image_processor;
        let normalized =
            tokio::task::spawn_blocking(move || processor.normalize(&image, max_dimension))
                .await
                .map_err(|e| RedesignError::Internal(format!("Image worker failed: {}", e)))??;

        debug!(
            "Normalized image to {}x{} ({} bytes)",
            normalized.width,
            normalized.height,
            normalized.data.len()
        );
        Ok((Bytes::from(normalized.data), normalized.mime_type.to_string()))
    }
}
