// src/services/providers/hf_inference.rs
use super::{
    Credential, ImageInput, ProviderAdapter, error_message_from_body, http_client, transport_error,
};
use crate::config::HfInferenceSettings;
use crate::errors::RedesignError;
use crate::models::{GenerationParams, ProviderOutput};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use log::debug;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::json;
use std::time::Duration;

/// Hosted inference endpoint that answers with raw image bytes on success.
pub struct HfInferenceProvider {
    endpoint: String,
    credential: Credential,
    client: Client,
}

impl HfInferenceProvider {
    pub fn new(
        settings: &HfInferenceSettings,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self, RedesignError> {
        Ok(Self {
            endpoint: settings.endpoint.clone(),
            credential,
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl ProviderAdapter for HfInferenceProvider {
    fn name(&self) -> &str {
        "hf-inference"
    }

    fn default_params(&self) -> GenerationParams {
        GenerationParams {
            guidance_scale: 7.5,
            num_inference_steps: 30,
            negative_prompt: None,
            seed: None,
        }
    }

    fn check_configuration(&self) -> Result<(), RedesignError> {
        self.credential.resolve().map(|_| ())
    }

    async fn generate(
        &self,
        image: ImageInput<'_>,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderOutput, RedesignError> {
        let token = self.credential.resolve()?;

        let mut parameters = json!({
            "prompt": prompt,
            "guidance_scale": params.guidance_scale,
            "num_inference_steps": params.num_inference_steps,
        });
        if let Some(negative_prompt) = &params.negative_prompt {
            parameters["negative_prompt"] = json!(negative_prompt);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&token)
            .json(&json!({
                "inputs": general_purpose::STANDARD.encode(image.data),
                "parameters": parameters,
            }))
            .send()
            .await
            .map_err(|e| transport_error("Inference API", e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .unwrap_or_default();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RedesignError::ProviderApi {
                status: status.as_u16(),
                message: error_message_from_body(&body),
            });
        }

        if !content_type.starts_with("image/") {
            let body = response.text().await.unwrap_or_default();
            return Err(RedesignError::Provider(format!(
                "Expected image from inference API, got {}: {}",
                if content_type.is_empty() { "no content type" } else { content_type.as_str() },
                error_message_from_body(&body)
            )));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| transport_error("Inference API", e))?
            .to_vec();
        debug!("Inference API returned {} bytes of {}", data.len(), content_type);

        Ok(ProviderOutput::InlineImage {
            data,
            mime_type: content_type,
        })
    }
}
